use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod health;
pub mod jobs;
pub mod link;
pub mod messages;
pub mod session;
pub mod telegram;

use commands::Command;
use config::{ApiCredentials, Config};
use db::Database;
use jobs::{BatchConfig, JobRegistry};
use telegram::LoginFlow;

// ──────────────────────────────────────────────────────────────
// Main application setup
// ──────────────────────────────────────────────────────────────

pub async fn run() -> Result<()> {
    // Load .env file if it exists (for local development)
    dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting save bot...");

    let config = Config::from_env()?;
    let bot = Bot::from_env();

    // --- SQLite Pool ---
    let db_url = db::prepare_sqlite_url(&config.db_url);
    tracing::info!("Connecting to database at: {}", &db_url);
    let pool = db::connect_db(&db_url, 5).await?;
    db::ensure_schema(&pool).await?;
    let db = Database::new(pool);
    tracing::info!("Database connection successful.");

    // --- Shared services ---
    let registry = Arc::new(JobRegistry::new());
    let login = Arc::new(LoginFlow::new(config.credentials.clone()));
    let batch_config = Arc::new(config.batch.clone());
    let credentials = config.credentials.clone();

    // --- Health endpoint ---
    let listener = health::bind(config.health_port).await?;
    tokio::spawn(health::serve(listener));

    // --- Handler Setup ---
    let handler = dptree::entry().branch(
        Update::filter_message()
            .branch(dptree::entry().filter_command::<Command>().endpoint(
                |bot: Bot,
                 msg: Message,
                 cmd: Command,
                 db: Database,
                 registry: Arc<JobRegistry>,
                 login: Arc<LoginFlow>,
                 credentials: ApiCredentials,
                 batch_config: Arc<BatchConfig>| async move {
                    cmd.dispatch(bot, msg, db, registry, login, credentials, batch_config)
                        .await
                },
            ))
            .branch(
                dptree::filter(|msg: Message, login: Arc<LoginFlow>| {
                    msg.from
                        .as_ref()
                        .is_some_and(|user| login.is_pending(user.id.0 as i64))
                })
                .endpoint(handlers::handle_login_input),
            ),
    );

    // --- Dispatcher ---
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, registry, login, credentials, batch_config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
