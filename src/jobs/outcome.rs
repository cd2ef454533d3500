use std::time::Duration;

/// Media classification used for the kind-dispatched upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Animation,
    Sticker,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice message",
            MediaKind::Animation => "animation",
            MediaKind::Sticker => "sticker",
        }
    }
}

/// What the worker delivered for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Text,
    Media(MediaKind),
}

/// Terminal result of processing a single message. The worker never
/// returns an error; every exit path maps to one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Delivered(Delivery),
    NotFound,
    NoAccess,
    DownloadFailed,
    UploadFailed,
    RateLimited { retry_after: Duration },
    Cancelled,
    TransientError,
}

impl RetrievalOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RetrievalOutcome::Delivered(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetrievalOutcome::Cancelled)
    }

    /// Short human-readable reason, used in user-facing failure messages.
    pub fn describe(&self) -> String {
        match self {
            RetrievalOutcome::Delivered(Delivery::Text) => "delivered text".to_string(),
            RetrievalOutcome::Delivered(Delivery::Media(kind)) => {
                format!("delivered {}", kind.label())
            }
            RetrievalOutcome::NotFound => "message not found".to_string(),
            RetrievalOutcome::NoAccess => "no access to the chat".to_string(),
            RetrievalOutcome::DownloadFailed => "download failed".to_string(),
            RetrievalOutcome::UploadFailed => "upload failed".to_string(),
            RetrievalOutcome::RateLimited { retry_after } => {
                format!("rate limited, retry in {}s", retry_after.as_secs())
            }
            RetrievalOutcome::Cancelled => "cancelled".to_string(),
            RetrievalOutcome::TransientError => "temporary error".to_string(),
        }
    }
}
