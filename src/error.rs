use std::time::Duration;

/// Errors crossing the session boundaries (user client and bot client).
///
/// Handlers and the worker match on these to decide between retrying,
/// waiting out a rate limit, or giving up on a single message.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("message not found")]
    NotFound,

    #[error("no access to the chat")]
    NoAccess,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("rate limited for {}s", .retry_after.as_secs())]
    FloodWait { retry_after: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Transport(String),
}

impl RelayError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RelayError::NotFound
                | RelayError::NoAccess
                | RelayError::NotLoggedIn
                | RelayError::Cancelled
        )
    }
}
