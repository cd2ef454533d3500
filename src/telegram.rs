// Real Telegram backends for the session traits: the delegated MTProto
// user client and the Bot-API sink.

pub mod bot_sink;
pub mod login;
pub mod user_session;

pub use bot_sink::BotSink;
pub use login::{LoginFlow, LoginReply};
pub use user_session::UserSession;
