use std::{str::FromStr, time::Duration};

use anyhow::Context;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub index_database_url: String,
    pub bind_addr: String,
    pub session_idle_minutes: i64,
    pub relay: RelayConfig,
}

/// Retry settings for moving messages from the outbox into the search index.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub poll_interval: Duration,
    pub batch_size: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            batch_size: 64,
        }
    }
}

impl RelayConfig {
    /// Delay before retry number `attempts` (1-based), doubling up to the cap.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let shift = attempts.saturating_sub(1).min(20);
        self.initial_retry_delay
            .saturating_mul(1 << shift)
            .min(self.max_retry_delay)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();

        let defaults = RelayConfig::default();
        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://chat.db?mode=rwc".to_owned())?,
            index_database_url: var_or("INDEX_DATABASE_URL", "sqlite://chat-index.db?mode=rwc".to_owned())?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8080".to_owned())?,
            session_idle_minutes: var_or("SESSION_IDLE_MINUTES", 30)?,
            relay: RelayConfig {
                initial_retry_delay: Duration::from_millis(var_or(
                    "INDEX_RETRY_INITIAL_MS",
                    defaults.initial_retry_delay.as_millis() as u64,
                )?),
                max_retry_delay: Duration::from_millis(var_or(
                    "INDEX_RETRY_MAX_MS",
                    defaults.max_retry_delay.as_millis() as u64,
                )?),
                poll_interval: Duration::from_millis(var_or(
                    "INDEX_POLL_INTERVAL_MS",
                    defaults.poll_interval.as_millis() as u64,
                )?),
                batch_size: var_or("INDEX_BATCH_SIZE", defaults.batch_size)?,
            },
        })
    }
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
