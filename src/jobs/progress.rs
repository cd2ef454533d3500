//! Throttle policy for progress edits.
//!
//! Telegram edits are expensive (and rate limited), so progress updates
//! are gated to a minimum interval. Built on `tokio::time::Instant` so
//! tests can drive it with a paused clock.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    /// Default minimum spacing between edits.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(400);

    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Returns true (and arms the interval) if enough time has passed
    /// since the last allowed update. The first call always passes.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// Renders a `downloaded/total` pair as a short progress line.
pub fn format_progress(label: &str, downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let percent = (downloaded.min(total) * 100) / total;
            format!("Downloading {label}... {percent}%")
        }
        _ => format!("Downloading {label}... {} KiB", downloaded / 1024),
    }
}
