use std::sync::Arc;

use anyhow::Result;
use teloxide::{prelude::*, utils::command::BotCommands};

use crate::config::ApiCredentials;
use crate::db::Database;
use crate::handlers::{cancel_job, help, logout, save_message, start_batch, start_login};
use crate::jobs::{BatchConfig, JobRegistry};
use crate::telegram::LoginFlow;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "display this text.")]
    Start,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "link your Telegram account.")]
    Login,
    #[command(description = "remove your linked account session.")]
    Logout,
    #[command(description = "save a single message: /save <link>.")]
    Save(String),
    #[command(description = "save a range of messages: /batch <link> <first-last>.")]
    Batch(String),
    #[command(description = "cancel the running batch job.")]
    Cancel,
}

impl Command {
    #[allow(clippy::too_many_arguments)]
    pub async fn dispatch(
        self,
        bot: Bot,
        msg: Message,
        db: Database,
        registry: Arc<JobRegistry>,
        login: Arc<LoginFlow>,
        credentials: ApiCredentials,
        batch_config: Arc<BatchConfig>,
    ) -> Result<()> {
        match self {
            Command::Start | Command::Help => help(bot, msg).await?,
            Command::Login => start_login(bot, msg, login, db).await?,
            Command::Logout => logout(bot, msg, login, db).await?,
            Command::Save(arg) => {
                save_message(bot, msg, db, credentials, batch_config, arg).await?
            }
            Command::Batch(args) => {
                start_batch(bot, msg, db, registry, credentials, batch_config, args).await?
            }
            Command::Cancel => cancel_job(bot, msg, registry).await?,
        }
        Ok(())
    }
}
