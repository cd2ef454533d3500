use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::jobs::BatchConfig;

/// MTProto application credentials, shared by the login flow and the
/// per-command user clients.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_id: i32,
    pub api_hash: String,
}

#[derive(Clone)]
pub struct Config {
    pub db_url: String,
    pub credentials: ApiCredentials,
    pub health_port: u16,
    pub batch: BatchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_id = env::var("API_ID")
            .context("API_ID is not set")?
            .parse()
            .context("API_ID is not a number")?;
        let api_hash = env::var("API_HASH").context("API_HASH is not set")?;

        let db_url = env::var("DB_URL").unwrap_or_else(|_| "sqlite:savebot.db".to_string());
        let health_port = match env::var("HEALTH_PORT") {
            Ok(port) => port.parse().context("HEALTH_PORT is not a port number")?,
            Err(_) => 8080,
        };

        let mut batch = BatchConfig::default();
        if let Ok(size) = env::var("BATCH_CHUNK_SIZE") {
            batch.chunk_size = size.parse().context("BATCH_CHUNK_SIZE is not a number")?;
        }
        if let Ok(limit) = env::var("BATCH_CONCURRENCY") {
            batch.max_concurrency = limit.parse().context("BATCH_CONCURRENCY is not a number")?;
        }
        if let Ok(delay_ms) = env::var("BATCH_SPAWN_DELAY_MS") {
            batch.spawn_delay = Duration::from_millis(
                delay_ms.parse().context("BATCH_SPAWN_DELAY_MS is not a number")?,
            );
        }
        if let Ok(dir) = env::var("WORK_DIR") {
            batch.worker.work_dir = PathBuf::from(dir);
        }

        Ok(Self {
            db_url,
            credentials: ApiCredentials { api_id, api_hash },
            health_port,
            batch,
        })
    }
}
