//! `/batch <link> <range>` and `/cancel`.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;

use crate::config::ApiCredentials;
use crate::db::Database;
use crate::jobs::{run_batch, BatchConfig, JobRegistry};
use crate::link::{parse_message_link, parse_range};
use crate::messages;
use crate::telegram::{BotSink, UserSession};

pub async fn start_batch(
    bot: Bot,
    msg: Message,
    db: Database,
    registry: Arc<JobRegistry>,
    credentials: ApiCredentials,
    cfg: Arc<BatchConfig>,
    args: String,
) -> Result<()> {
    let Some(user_id) = msg.from.as_ref().map(|user| user.id.0 as i64) else {
        return Ok(());
    };

    let mut parts = args.split_whitespace();
    let (Some(link_arg), Some(range_arg), None) = (parts.next(), parts.next(), parts.next())
    else {
        bot.send_message(msg.chat.id, messages::BATCH_USAGE).await?;
        return Ok(());
    };
    let Some(link) = parse_message_link(link_arg) else {
        bot.send_message(msg.chat.id, messages::BAD_LINK).await?;
        return Ok(());
    };
    let Some(range) = parse_range(range_arg) else {
        bot.send_message(msg.chat.id, messages::BAD_RANGE).await?;
        return Ok(());
    };

    if registry.is_active(user_id) {
        bot.send_message(msg.chat.id, messages::ALREADY_ACTIVE).await?;
        return Ok(());
    }
    let Some(session) = db.get_session(user_id).await? else {
        bot.send_message(msg.chat.id, messages::NOT_LOGGED_IN).await?;
        return Ok(());
    };

    // Connect before spawning so a broken session is reported inline.
    let source = match UserSession::connect(&credentials, &session).await {
        Ok(source) => Arc::new(source),
        Err(err) => {
            tracing::warn!(user_id, error = %err, "User session connect failed");
            bot.send_message(msg.chat.id, messages::SESSION_BROKEN).await?;
            return Ok(());
        }
    };
    let dest = Arc::new(BotSink::new(bot.clone()));
    let dest_chat = msg.chat.id.0;

    tokio::spawn(async move {
        let result = run_batch(
            source,
            dest,
            &registry,
            user_id,
            link.chat,
            range,
            dest_chat,
            &cfg,
        )
        .await;
        // The race between the is_active check above and this start.
        if result.is_err() {
            if let Err(err) = bot
                .send_message(ChatId(dest_chat), messages::ALREADY_ACTIVE)
                .await
            {
                tracing::warn!(error = %err, "Failed to report busy job slot");
            }
        }
    });
    Ok(())
}

/// `/cancel`: trips the active job's token; the orchestrator drains and
/// reports the final tally itself.
pub async fn cancel_job(bot: Bot, msg: Message, registry: Arc<JobRegistry>) -> Result<()> {
    let Some(user_id) = msg.from.as_ref().map(|user| user.id.0 as i64) else {
        return Ok(());
    };
    let text = if registry.cancel(user_id) {
        messages::CANCEL_REQUESTED
    } else {
        messages::NO_ACTIVE_JOB
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
