//! The bot-session side of the relay, backed by teloxide.

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId};
use teloxide::{ApiError, RequestError};

use crate::error::RelayError;
use crate::jobs::MediaKind;
use crate::session::DestSession;

#[derive(Clone)]
pub struct BotSink {
    bot: Bot,
}

impl BotSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl DestSession for BotSink {
    async fn send_text(&self, chat: i64, text: &str) -> Result<(), RelayError> {
        self.bot
            .send_message(ChatId(chat), text)
            .await
            .map_err(map_request)?;
        Ok(())
    }

    async fn send_media(
        &self,
        chat: i64,
        kind: MediaKind,
        file: &Path,
        caption: Option<&str>,
        thumbnail: Option<&Path>,
    ) -> Result<(), RelayError> {
        let chat = ChatId(chat);
        let input = InputFile::file(file.to_path_buf());
        match kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await.map_err(map_request)?;
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(thumb) = thumbnail {
                    req = req.thumbnail(InputFile::file(thumb.to_path_buf()));
                }
                req.await.map_err(map_request)?;
            }
            MediaKind::Audio => {
                let mut req = self.bot.send_audio(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await.map_err(map_request)?;
            }
            MediaKind::Voice => {
                let mut req = self.bot.send_voice(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await.map_err(map_request)?;
            }
            MediaKind::Animation => {
                let mut req = self.bot.send_animation(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await.map_err(map_request)?;
            }
            // Stickers take no caption on the Bot API.
            MediaKind::Sticker => {
                self.bot.send_sticker(chat, input).await.map_err(map_request)?;
            }
            MediaKind::Document => {
                let mut req = self.bot.send_document(chat, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(thumb) = thumbnail {
                    req = req.thumbnail(InputFile::file(thumb.to_path_buf()));
                }
                req.await.map_err(map_request)?;
            }
        }
        Ok(())
    }

    async fn send_status(&self, chat: i64, text: &str) -> Result<i32, RelayError> {
        let sent = self
            .bot
            .send_message(ChatId(chat), text)
            .await
            .map_err(map_request)?;
        Ok(sent.id.0)
    }

    async fn edit_status(
        &self,
        chat: i64,
        message_id: i32,
        text: &str,
    ) -> Result<(), RelayError> {
        match self
            .bot
            .edit_message_text(ChatId(chat), MessageId(message_id), text)
            .await
        {
            Ok(_) => Ok(()),
            // Same text twice is not worth surfacing.
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(err) => Err(map_request(err)),
        }
    }

    async fn delete_status(&self, chat: i64, message_id: i32) -> Result<(), RelayError> {
        self.bot
            .delete_message(ChatId(chat), MessageId(message_id))
            .await
            .map_err(map_request)?;
        Ok(())
    }
}

fn map_request(err: RequestError) -> RelayError {
    match err {
        RequestError::RetryAfter(seconds) => RelayError::FloodWait {
            retry_after: seconds.duration(),
        },
        other => RelayError::Transport(other.to_string()),
    }
}
