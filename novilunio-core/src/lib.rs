pub mod config;
pub mod display;
pub mod poll;
pub mod store;

// Config re-exports
pub use config::{
    BotKind, Config, ConfigError, DataDir, PollSettings, Secrets, SecretsError, SettingsStore,
    WatchSettings, load_dotenv,
};

// Poll re-exports
pub use poll::{
    NewPoll, PlatformRef, PollDraft, PollError, PollHost, PollId, PollLedger, PollRecord,
    PollReport, PollStatus, PollTally,
};

pub use store::StoreError;

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
