//! Configuration management for the novilunio bots.
//!
//! Secrets come from environment variables, everything else from small JSON
//! files inside the bot's data directory.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `DISCORD_BOT_TOKEN` - Discord bot token
//!
//! ## Data directory
//! - `POWL_DATA_DIR` - powl data directory (default `./.pollbot`)
//! - `ROBLIN_DATA_DIR` - roblin data directory (default `./.roblin`)
//!
//! ## Settings (JSON files in the data directory)
//! - `poll_settings.json` - poll defaults (channel, majority, quorum, duration)
//! - `settings.json` - watcher settings (channel, urls, role, check_every)

mod paths;
mod secrets;
mod settings;

pub use paths::{BotKind, DataDir};
pub use secrets::{DISCORD_BOT_TOKEN_ENV, Secrets, SecretsError};
pub use settings::{
    DEFAULT_CHECK_EVERY_SECS, MIN_CHECK_EVERY_SECS, PollSettings, SettingsStore, WatchSettings,
};

use crate::store::StoreError;

/// Everything a bot needs before connecting.
#[derive(Debug, Clone)]
pub struct Config {
    pub kind: BotKind,
    pub secrets: Secrets,
    pub data_dir: DataDir,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Data directory error: {0}")]
    DataDir(#[from] StoreError),
}

impl Config {
    /// Load secrets and resolve (and create) the data directory for `kind`.
    pub fn load(kind: BotKind) -> Result<Self, ConfigError> {
        load_dotenv();
        let secrets = Secrets::from_env()?;
        let data_dir = DataDir::resolve(kind);
        data_dir.ensure()?;

        Ok(Self {
            kind,
            secrets,
            data_dir,
        })
    }
}

/// Load `.env` into the process environment if present.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
