//! `/save <link>`: one message through the worker, outside the registry.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;

use crate::config::ApiCredentials;
use crate::db::Database;
use crate::jobs::{process_message, BatchConfig, JobHandle};
use crate::link::parse_message_link;
use crate::messages;
use crate::telegram::{BotSink, UserSession};

pub async fn save_message(
    bot: Bot,
    msg: Message,
    db: Database,
    credentials: ApiCredentials,
    cfg: Arc<BatchConfig>,
    arg: String,
) -> Result<()> {
    let Some(user_id) = msg.from.as_ref().map(|user| user.id.0 as i64) else {
        return Ok(());
    };
    let arg = arg.trim();
    if arg.is_empty() {
        bot.send_message(msg.chat.id, messages::SAVE_USAGE).await?;
        return Ok(());
    }
    let Some(link) = parse_message_link(arg) else {
        bot.send_message(msg.chat.id, messages::BAD_LINK).await?;
        return Ok(());
    };
    let Some(session) = db.get_session(user_id).await? else {
        bot.send_message(msg.chat.id, messages::NOT_LOGGED_IN).await?;
        return Ok(());
    };

    let source = match UserSession::connect(&credentials, &session).await {
        Ok(source) => source,
        Err(err) => {
            tracing::warn!(user_id, error = %err, "User session connect failed");
            bot.send_message(msg.chat.id, messages::SESSION_BROKEN).await?;
            return Ok(());
        }
    };
    let dest = BotSink::new(bot.clone());

    // A one-off job handle: same worker semantics, no registry slot.
    let job = JobHandle::standalone(1);
    let outcome = process_message(
        &source,
        &dest,
        &job,
        &link.chat,
        link.message_id,
        msg.chat.id.0,
        &cfg.worker,
    )
    .await;

    if !outcome.is_delivered() {
        tracing::info!(user_id, outcome = ?outcome, "Save failed");
        bot.send_message(msg.chat.id, messages::save_failed(&outcome.describe()))
            .await?;
    }
    Ok(())
}
