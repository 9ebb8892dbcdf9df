//! Poll lifecycle: records, rules, the persistent ledger and exports.

pub mod engine;
pub mod export;
pub mod host;
pub mod ledger;
pub mod record;
pub mod report;

pub use engine::{
    DEFAULT_OPTIONS, MAX_ANSWER_CHARS, MAX_DURATION_SECS, MAX_OPTIONS, MIN_OPTIONS, PollDraft,
    ValidatedPoll, validate_settings,
};
pub use export::{csv_file_name, render_csv, write_csv};
pub use host::PollHost;
pub use ledger::{LEDGER_PAGE_SIZE, PollLedger};
pub use record::{NewPoll, PlatformRef, PollId, PollRecord, PollStatus};
pub use report::{OptionTally, OptionVerdict, PollReport, PollTally};

use crate::store::StoreError;

/// Errors raised by poll operations.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Invalid poll configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Illegal status transition {from} -> {to}")]
    InvalidTransition { from: PollStatus, to: PollStatus },

    #[error("Poll {0} not found")]
    NotFound(PollId),

    #[error("Poll {0} has been deleted")]
    PollDeleted(PollId),

    #[error("Host platform error: {0}")]
    Host(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
