use anyhow::Result;
use teloxide::prelude::*;

use crate::messages;

/// Sends the help message.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, messages::HELP_TEXT)
        .parse_mode(teloxide::types::ParseMode::Html)
        .await?;
    Ok(())
}
