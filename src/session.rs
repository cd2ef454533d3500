//! Seams between the job machinery and the two Telegram sessions.
//!
//! The worker only sees these traits. The real implementations live in
//! [`crate::telegram`]; tests substitute in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::jobs::MediaKind;
use crate::link::ChatRef;

/// What the worker needs to know about an attached media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    pub file_name: String,
    pub size: Option<u64>,
}

/// Receives download progress. Implementations decide how (and whether)
/// to surface it to the user.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, downloaded: u64, total: Option<u64>);
}

/// A progress sink that drops everything.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn report(&self, _downloaded: u64, _total: Option<u64>) {}
}

/// A message as seen through the delegated user session.
pub trait SourceMessage: Send + Sync {
    fn id(&self) -> i32;
    fn text(&self) -> Option<&str>;
    fn media(&self) -> Option<MediaInfo>;
}

/// The delegated user session: fetches messages and downloads media from
/// chats the bot itself cannot see.
#[async_trait]
pub trait SourceSession: Send + Sync {
    type Message: SourceMessage;

    /// Fetches one message. `Ok(None)` means the id does not exist (or was
    /// deleted); access failures surface as [`RelayError::NoAccess`].
    async fn fetch_message(
        &self,
        chat: &ChatRef,
        message_id: i32,
    ) -> Result<Option<Self::Message>, RelayError>;

    /// Downloads the message's media to `dest`, reporting progress after
    /// each chunk and honoring `cancel` between chunks.
    async fn download_media(
        &self,
        message: &Self::Message,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), RelayError>;

    /// Best-effort thumbnail fetch for video uploads. `Ok(None)` when the
    /// media carries no usable thumbnail.
    async fn download_thumbnail(
        &self,
        message: &Self::Message,
        dest: &Path,
    ) -> Result<Option<PathBuf>, RelayError>;
}

/// The bot session: everything sent to the destination chat goes through
/// here.
#[async_trait]
pub trait DestSession: Send + Sync {
    async fn send_text(&self, chat: i64, text: &str) -> Result<(), RelayError>;

    /// Uploads a file, dispatched by media kind on the Bot API side.
    async fn send_media(
        &self,
        chat: i64,
        kind: MediaKind,
        file: &Path,
        caption: Option<&str>,
        thumbnail: Option<&Path>,
    ) -> Result<(), RelayError>;

    /// Posts a transient status message and returns its id.
    async fn send_status(&self, chat: i64, text: &str) -> Result<i32, RelayError>;

    async fn edit_status(&self, chat: i64, message_id: i32, text: &str)
        -> Result<(), RelayError>;

    async fn delete_status(&self, chat: i64, message_id: i32) -> Result<(), RelayError>;
}
