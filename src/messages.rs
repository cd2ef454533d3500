//! Shared text sent by the bot.
//!
//! Keep all user-facing strings in this module so they stay in one place and are
//! easy to update or translate.

pub const HELP_TEXT: &str =
    "I fetch messages from restricted chats through your own account and \
     re-upload them here.\n\n\
     <b>Commands:</b>\n\
     /login - Link your Telegram account (phone, code, 2FA if set).\n\
     /logout - Remove the linked account session.\n\
     /save &lt;link&gt; - Save a single message.\n\
     /batch &lt;link&gt; &lt;first-last&gt; - Save a range of messages.\n\
     /cancel - Stop the running batch job.";

pub const ASK_PHONE: &str =
    "Send your phone number in international format (e.g. +15551234567).";
pub const ASK_CODE: &str = "Enter the login code Telegram just sent you.";
pub const ASK_PASSWORD: &str = "Two-step verification is enabled. Enter your password.";
pub const INVALID_CODE: &str = "That code didn't work. Try again.";
pub const LOGIN_SUCCESS: &str = "Logged in! You can use /save and /batch now.";
pub const ALREADY_LOGGED_IN: &str = "You are already logged in. Use /logout first to relink.";
pub const NOT_LOGGED_IN: &str = "You need to /login first.";
pub const LOGOUT_DONE: &str = "Your session has been removed.";
pub const LOGIN_PRIVATE_ONLY: &str = "Login only works in a private chat with me.";

pub const SAVE_USAGE: &str = "Usage: /save <t.me link>";
pub const BATCH_USAGE: &str = "Usage: /batch <t.me link> <first-last>";
pub const BAD_LINK: &str = "I can't parse that link. Expected t.me/<chat>/<id>.";
pub const BAD_RANGE: &str = "I can't parse that range. Expected a number or first-last.";
pub const SESSION_BROKEN: &str =
    "Your saved session no longer works. Use /logout and /login again.";

pub const ALREADY_ACTIVE: &str =
    "You already have a batch running. /cancel it before starting another.";
pub const CANCEL_REQUESTED: &str =
    "Cancelling... in-flight messages will finish, nothing new will start.";
pub const NO_ACTIVE_JOB: &str = "No batch job is running.";

pub const EMPTY_MESSAGE_TEXT: &str = "(empty message)";

pub fn login_failed(reason: &str) -> String {
    format!("Login failed: {reason}. Use /login to start over.")
}

pub fn save_failed(reason: &str) -> String {
    format!("Couldn't save that message: {reason}.")
}

pub fn preparing(file_name: &str) -> String {
    format!("Preparing {file_name}...")
}

pub fn download_complete(file_name: &str) -> String {
    format!("Downloading {file_name}... 100%")
}

pub fn large_range_warning(total: u64) -> String {
    format!(
        "That's {total} messages. This will take a while and may hit rate limits; \
         /cancel stops it at any point."
    )
}

pub fn batch_progress(done: u64, total: u64, succeeded: u64, failed: u64) -> String {
    format!("Progress: {done}/{total} ({succeeded} saved, {failed} failed)")
}

pub fn batch_summary(succeeded: u64, failed: u64, cancelled: bool) -> String {
    if cancelled {
        format!("Batch cancelled. Saved {succeeded}, failed {failed}.")
    } else {
        format!("Batch complete. Saved {succeeded}, failed {failed}.")
    }
}
