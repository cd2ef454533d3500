//! Command glue for the interactive login flow.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;

use crate::db::Database;
use crate::messages;
use crate::telegram::{LoginFlow, LoginReply};

fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

/// `/login` entry point.
pub async fn start_login(
    bot: Bot,
    msg: Message,
    login: Arc<LoginFlow>,
    db: Database,
) -> Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    if !msg.chat.is_private() {
        bot.send_message(msg.chat.id, messages::LOGIN_PRIVATE_ONLY)
            .await?;
        return Ok(());
    }
    if db.get_session(user_id).await?.is_some() {
        bot.send_message(msg.chat.id, messages::ALREADY_LOGGED_IN)
            .await?;
        return Ok(());
    }
    login.begin(user_id);
    bot.send_message(msg.chat.id, messages::ASK_PHONE).await?;
    Ok(())
}

/// Plain-text messages from users with a pending login (phone, code or
/// password). Routed here by the dispatcher filter.
pub async fn handle_login_input(
    bot: Bot,
    msg: Message,
    login: Arc<LoginFlow>,
    db: Database,
) -> Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(reply) = login.advance(user_id, text).await else {
        return Ok(());
    };
    match reply {
        LoginReply::NeedCode => {
            bot.send_message(msg.chat.id, messages::ASK_CODE).await?;
        }
        LoginReply::NeedPassword => {
            bot.send_message(msg.chat.id, messages::ASK_PASSWORD).await?;
        }
        LoginReply::BadCode => {
            bot.send_message(msg.chat.id, messages::INVALID_CODE).await?;
        }
        LoginReply::LoggedIn { session } => {
            db.save_session(user_id, &session).await?;
            tracing::info!(user_id, "User logged in");
            bot.send_message(msg.chat.id, messages::LOGIN_SUCCESS).await?;
        }
        LoginReply::Failed(reason) => {
            tracing::warn!(user_id, reason = %reason, "Login failed");
            bot.send_message(msg.chat.id, messages::login_failed(&reason))
                .await?;
        }
    }
    Ok(())
}

/// `/logout`: drops the stored session and any half-finished login.
pub async fn logout(bot: Bot, msg: Message, login: Arc<LoginFlow>, db: Database) -> Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    login.clear(user_id);
    let removed = db.delete_session(user_id).await?;
    let text = if removed {
        messages::LOGOUT_DONE
    } else {
        messages::NOT_LOGGED_IN
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
