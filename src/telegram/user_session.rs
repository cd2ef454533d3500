//! The delegated user session, backed by grammers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use grammers_client::types::photo_sizes::VecExt;
use grammers_client::types::{Chat, Downloadable, Media, Message};
use grammers_client::{Client, Config, InitParams, InvocationError};
use grammers_session::Session;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::ApiCredentials;
use crate::error::RelayError;
use crate::jobs::MediaKind;
use crate::link::ChatRef;
use crate::session::{MediaInfo, ProgressSink, SourceMessage, SourceSession};

pub struct UserSession {
    client: Client,
}

impl UserSession {
    /// Reconnects a stored session. Fails with [`RelayError::NotLoggedIn`]
    /// when the session bytes no longer authorize.
    pub async fn connect(creds: &ApiCredentials, session_b64: &str) -> Result<Self, RelayError> {
        let bytes = BASE64
            .decode(session_b64)
            .map_err(|err| RelayError::Transport(format!("corrupt session: {err}")))?;
        let session = Session::load(&bytes)
            .map_err(|err| RelayError::Transport(format!("corrupt session: {err}")))?;

        let client = Client::connect(Config {
            session,
            api_id: creds.api_id,
            api_hash: creds.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|err| RelayError::Transport(err.to_string()))?;

        match client.is_authorized().await {
            Ok(true) => Ok(Self { client }),
            Ok(false) => Err(RelayError::NotLoggedIn),
            Err(err) => Err(RelayError::Transport(err.to_string())),
        }
    }

    async fn resolve_chat(&self, chat_ref: &ChatRef) -> Result<Chat, RelayError> {
        match chat_ref {
            ChatRef::Handle(name) => self
                .client
                .resolve_username(name)
                .await
                .map_err(map_invocation)?
                .ok_or(RelayError::NotFound),
            ChatRef::Id(id) => {
                // Private links carry the Bot-API id; the chat must be in
                // the account's dialogs to be addressable at all.
                let mut dialogs = self.client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await.map_err(map_invocation)? {
                    let chat = dialog.chat();
                    if bot_api_id(chat) == *id {
                        return Ok(chat.clone());
                    }
                }
                Err(RelayError::NoAccess)
            }
        }
    }
}

#[async_trait]
impl SourceSession for UserSession {
    type Message = Message;

    async fn fetch_message(
        &self,
        chat: &ChatRef,
        message_id: i32,
    ) -> Result<Option<Message>, RelayError> {
        let chat = self.resolve_chat(chat).await?;
        let mut messages = self
            .client
            .get_messages_by_id(&chat, &[message_id])
            .await
            .map_err(map_invocation)?;
        Ok(messages.pop().flatten())
    }

    async fn download_media(
        &self,
        message: &Message,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), RelayError> {
        let media = message.media().ok_or(RelayError::NotFound)?;
        let total = media_size(&media);

        let mut file = tokio::fs::File::create(dest).await?;
        let mut download = self.client.iter_download(&Downloadable::Media(media));
        let mut downloaded: u64 = 0;
        while let Some(chunk) = download.next().await.map_err(map_invocation)? {
            if cancel.is_cancelled() {
                return Err(RelayError::Cancelled);
            }
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.report(downloaded, total).await;
        }
        file.flush().await?;
        Ok(())
    }

    async fn download_thumbnail(
        &self,
        message: &Message,
        dest: &Path,
    ) -> Result<Option<PathBuf>, RelayError> {
        let Some(Media::Document(document)) = message.media() else {
            return Ok(None);
        };
        let thumbs = document.thumbs();
        let Some(thumb) = thumbs.largest() else {
            return Ok(None);
        };
        self.client
            .download_media(&Downloadable::PhotoSize(thumb.clone()), dest)
            .await
            .map_err(|err| RelayError::Transport(err.to_string()))?;
        Ok(Some(dest.to_path_buf()))
    }
}

impl SourceMessage for Message {
    fn id(&self) -> i32 {
        Message::id(self)
    }

    fn text(&self) -> Option<&str> {
        Some(Message::text(self)).filter(|t| !t.is_empty())
    }

    fn media(&self) -> Option<MediaInfo> {
        let media = Message::media(self)?;
        Some(match &media {
            Media::Photo(_) => MediaInfo {
                kind: MediaKind::Photo,
                file_name: format!("photo-{}.jpg", Message::id(self)),
                size: None,
            },
            Media::Document(document) => {
                let kind = classify_document(document.mime_type());
                MediaInfo {
                    kind,
                    file_name: document_file_name(
                        document.name(),
                        document.mime_type(),
                        Message::id(self),
                    ),
                    size: Some(document.size() as u64),
                }
            }
            Media::Sticker(sticker) => MediaInfo {
                kind: MediaKind::Sticker,
                file_name: document_file_name(
                    sticker.document.name(),
                    sticker.document.mime_type(),
                    Message::id(self),
                ),
                size: Some(sticker.document.size() as u64),
            },
            // Contacts, polls, geo and the rest carry nothing to re-upload.
            _ => return None,
        })
    }
}

/// Bot-API chat id for a grammers chat: `-100`-concatenated for channels,
/// negated for legacy groups, bare for users.
fn bot_api_id(chat: &Chat) -> i64 {
    match chat {
        Chat::User(_) => chat.id(),
        Chat::Group(_) => -chat.id(),
        Chat::Channel(_) => format!("-100{}", chat.id()).parse().unwrap_or(0),
    }
}

fn classify_document(mime: Option<&str>) -> MediaKind {
    match mime {
        Some("audio/ogg") => MediaKind::Voice,
        Some("image/gif") => MediaKind::Animation,
        Some(m) if m.starts_with("video/") => MediaKind::Video,
        Some(m) if m.starts_with("audio/") => MediaKind::Audio,
        _ => MediaKind::Document,
    }
}

fn document_file_name(name: &str, mime: Option<&str>, message_id: i32) -> String {
    if !name.is_empty() {
        return name.to_string();
    }
    let extension = mime
        .and_then(|m| m.split('/').nth(1))
        .unwrap_or("bin");
    format!("file-{message_id}.{extension}")
}

fn media_size(media: &Media) -> Option<u64> {
    match media {
        Media::Document(document) => Some(document.size() as u64),
        Media::Sticker(sticker) => Some(sticker.document.size() as u64),
        _ => None,
    }
}

fn map_invocation(err: InvocationError) -> RelayError {
    match &err {
        InvocationError::Rpc(rpc) if rpc.name == "FLOOD_WAIT" => RelayError::FloodWait {
            retry_after: Duration::from_secs(rpc.value.unwrap_or(60) as u64),
        },
        InvocationError::Rpc(rpc)
            if rpc.name == "CHANNEL_PRIVATE"
                || rpc.name == "CHANNEL_INVALID"
                || rpc.name == "CHAT_FORBIDDEN"
                || rpc.name == "AUTH_KEY_UNREGISTERED" =>
        {
            RelayError::NoAccess
        }
        InvocationError::Rpc(rpc)
            if rpc.name == "MSG_ID_INVALID" || rpc.name == "MESSAGE_IDS_EMPTY" =>
        {
            RelayError::NotFound
        }
        _ => RelayError::Transport(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_names_fall_back_to_mime() {
        assert_eq!(document_file_name("clip.mp4", Some("video/mp4"), 7), "clip.mp4");
        assert_eq!(document_file_name("", Some("video/mp4"), 7), "file-7.mp4");
        assert_eq!(document_file_name("", None, 7), "file-7.bin");
    }

    #[test]
    fn documents_classify_by_mime() {
        assert_eq!(classify_document(Some("video/mp4")), MediaKind::Video);
        assert_eq!(classify_document(Some("audio/ogg")), MediaKind::Voice);
        assert_eq!(classify_document(Some("audio/mpeg")), MediaKind::Audio);
        assert_eq!(classify_document(Some("image/gif")), MediaKind::Animation);
        assert_eq!(classify_document(Some("application/pdf")), MediaKind::Document);
        assert_eq!(classify_document(None), MediaKind::Document);
    }
}
