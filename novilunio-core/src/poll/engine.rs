//! Poll rules: expiry, majority and quorum verdicts, status changes and
//! creation-time validation.
//!
//! Majority and quorum both use a strict `>` against the threshold share. A
//! threshold of 0 is met by any non-zero count, a threshold of 100 can never
//! be met.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::PollError;
use super::record::{PlatformRef, PollRecord, PollStatus};
use crate::config::PollSettings;

/// Answers appended to every poll after the user-supplied ones.
pub const DEFAULT_OPTIONS: [&str; 2] = ["Indifferente", "Contrario a tutte le precedenti"];

/// Fewest user-supplied options.
pub const MIN_OPTIONS: usize = 2;

/// Most user-supplied options; the platform caps a poll at ten answers.
pub const MAX_OPTIONS: usize = 10 - DEFAULT_OPTIONS.len();

/// Longest answer text the platform accepts, in characters.
pub const MAX_ANSWER_CHARS: usize = 55;

/// Longest voting window the platform accepts (7 days).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 3600;

/// Close every open record whose window has elapsed. Returns how many changed.
pub fn sweep_expired<'a, I>(records: I, now: DateTime<Utc>) -> usize
where
    I: IntoIterator<Item = &'a mut PollRecord>,
{
    let mut changed = 0;
    for record in records {
        if record.status == PollStatus::Open && record.is_expired(now) {
            record.status = PollStatus::Closed;
            changed += 1;
        }
    }
    changed
}

/// `vote_count > majority% of total_votes`.
pub fn evaluate_option(vote_count: u64, total_votes: u64, majority: u8) -> bool {
    u128::from(vote_count) * 100 > u128::from(majority) * u128::from(total_votes)
}

/// `total_votes > quorum% of eligible_count`.
pub fn evaluate_quorum(total_votes: u64, eligible_count: u64, quorum: u8) -> bool {
    u128::from(total_votes) * 100 > u128::from(quorum) * u128::from(eligible_count)
}

/// Move `record` to `next`, leaving it untouched when the move is illegal.
pub fn transition(record: &mut PollRecord, next: PollStatus) -> Result<(), PollError> {
    if !record.status.can_become(next) {
        return Err(PollError::InvalidTransition {
            from: record.status,
            to: next,
        });
    }
    debug!(from = %record.status, to = %next, "poll status change");
    record.status = next;
    Ok(())
}

pub fn close(record: &mut PollRecord) -> Result<(), PollError> {
    transition(record, PollStatus::Closed)
}

pub fn delete(record: &mut PollRecord) -> Result<(), PollError> {
    transition(record, PollStatus::Deleted)
}

/// Eligible ids that never voted, in eligible order, without duplicates.
pub fn non_voters<T>(eligible: &[T], voters: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let voted: HashSet<&T> = voters.iter().collect();
    let mut seen = HashSet::new();
    eligible
        .iter()
        .filter(|id| !voted.contains(id) && seen.insert(*id))
        .cloned()
        .collect()
}

/// A poll being composed, seeded from the settings defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollDraft {
    pub title: Option<String>,
    pub options: Vec<String>,
    pub channel: Option<u64>,
    pub majority: Option<i64>,
    pub quorum: Option<i64>,
    pub duration: Option<i64>,
}

/// A draft that passed validation, with the default options appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPoll {
    pub title: String,
    pub options: Vec<String>,
    pub channel: PlatformRef,
    pub majority: u8,
    pub quorum: u8,
    pub duration: u64,
}

impl PollDraft {
    pub fn from_settings(settings: &PollSettings) -> Self {
        Self {
            title: None,
            options: Vec::new(),
            channel: settings.channel,
            majority: settings.majority,
            quorum: settings.quorum,
            duration: settings.duration,
        }
    }

    /// Check every field and produce the poll to launch.
    pub fn validate(&self) -> Result<ValidatedPoll, PollError> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("il titolo non è impostato"))?
            .to_string();

        let mut options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        if options.iter().any(|o| o.is_empty()) {
            return Err(invalid("le opzioni di voto non possono essere vuote"));
        }
        if let Some(long) = options
            .iter()
            .find(|o| o.chars().count() > MAX_ANSWER_CHARS)
        {
            return Err(invalid(&format!(
                "l'opzione \"{long}\" supera i {MAX_ANSWER_CHARS} caratteri"
            )));
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(invalid(&format!(
                "servono da {MIN_OPTIONS} a {MAX_OPTIONS} opzioni di voto, ricevute {}",
                options.len()
            )));
        }

        let channel = self
            .channel
            .map(PlatformRef)
            .ok_or_else(|| invalid("il canale non è impostato"))?;
        let majority = threshold(self.majority, "maggioranza")?;
        let quorum = threshold(self.quorum, "quorum")?;

        let duration = window(self.duration)?;

        options.extend(DEFAULT_OPTIONS.iter().map(|o| o.to_string()));

        Ok(ValidatedPoll {
            title,
            options,
            channel,
            majority,
            quorum,
            duration,
        })
    }
}

/// Check values an operator is about to store as defaults. Unset fields pass.
pub fn validate_settings(settings: &PollSettings) -> Result<(), PollError> {
    if settings.majority.is_some() {
        threshold(settings.majority, "maggioranza")?;
    }
    if settings.quorum.is_some() {
        threshold(settings.quorum, "quorum")?;
    }
    if settings.duration.is_some() {
        window(settings.duration)?;
    }
    Ok(())
}

fn window(value: Option<i64>) -> Result<u64, PollError> {
    let value = value.ok_or_else(|| invalid("la durata non è impostata"))?;
    u64::try_from(value)
        .ok()
        .filter(|d| *d <= MAX_DURATION_SECS)
        .ok_or_else(|| {
            invalid(&format!(
                "la durata deve essere tra 0 e {MAX_DURATION_SECS} secondi"
            ))
        })
}

fn threshold(value: Option<i64>, name: &str) -> Result<u8, PollError> {
    let value = value.ok_or_else(|| invalid(&format!("la soglia di {name} non è impostata")))?;
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| invalid(&format!("la soglia di {name} deve essere tra 0 e 100")))
}

fn invalid(reason: &str) -> PollError {
    PollError::InvalidConfiguration(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::record::NewPoll;
    use chrono::TimeZone;

    fn record(created_at: DateTime<Utc>, duration: u64, status: PollStatus) -> PollRecord {
        let mut record = NewPoll {
            created_at,
            duration,
            quorum: 50,
            majority: 50,
            channel: PlatformRef(10),
            message: PlatformRef(11),
            thread: PlatformRef(12),
        }
        .into_record();
        record.status = status;
        record
    }

    fn valid_draft() -> PollDraft {
        PollDraft {
            title: Some("Nuovo logo".into()),
            options: vec!["Blu".into(), "Rosso".into()],
            channel: Some(99),
            majority: Some(50),
            quorum: Some(30),
            duration: Some(3600),
        }
    }

    #[test]
    fn test_validate_settings_checks_only_set_fields() {
        assert!(validate_settings(&PollSettings::default()).is_ok());
        let ok = PollSettings {
            channel: Some(1),
            majority: Some(100),
            quorum: Some(0),
            duration: Some(MAX_DURATION_SECS as i64),
        };
        assert!(validate_settings(&ok).is_ok());

        let bad_quorum = PollSettings {
            quorum: Some(101),
            ..PollSettings::default()
        };
        assert!(matches!(
            validate_settings(&bad_quorum),
            Err(PollError::InvalidConfiguration(_))
        ));
        let bad_duration = PollSettings {
            duration: Some(-5),
            ..PollSettings::default()
        };
        assert!(validate_settings(&bad_duration).is_err());
    }

    #[test]
    fn test_validate_rejects_long_answers() {
        let mut draft = valid_draft();
        draft.options = vec!["Blu".into(), "è".repeat(MAX_ANSWER_CHARS)];
        assert!(draft.validate().is_ok());

        draft.options = vec!["Blu".into(), "è".repeat(MAX_ANSWER_CHARS + 1)];
        match draft.validate() {
            Err(PollError::InvalidConfiguration(reason)) => {
                assert!(reason.contains("55 caratteri"));
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_majority_is_strict() {
        assert!(evaluate_option(6, 10, 50));
        assert!(!evaluate_option(5, 10, 50));
        assert!(evaluate_option(1, 10, 0));
        assert!(!evaluate_option(0, 10, 0));
        assert!(!evaluate_option(10, 10, 100));
    }

    #[test]
    fn test_quorum_is_strict() {
        assert!(!evaluate_quorum(50, 100, 50));
        assert!(evaluate_quorum(51, 100, 50));
        assert!(!evaluate_quorum(0, 0, 0));
    }

    #[test]
    fn test_sweep_closes_only_expired_open_records() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(100);
        let mut records = vec![
            record(start, 100, PollStatus::Open),
            record(start, 101, PollStatus::Open),
            record(start, 0, PollStatus::Deleted),
        ];

        assert_eq!(sweep_expired(records.iter_mut(), now), 1);
        assert_eq!(records[0].status, PollStatus::Closed);
        assert_eq!(records[1].status, PollStatus::Open);
        assert_eq!(records[2].status, PollStatus::Deleted);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let now = start + chrono::Duration::days(2);
        let mut records = vec![
            record(start, 60, PollStatus::Open),
            record(start, 86_400 * 3, PollStatus::Open),
        ];

        sweep_expired(records.iter_mut(), now);
        let once = records.clone();
        assert_eq!(sweep_expired(records.iter_mut(), now), 0);
        assert_eq!(records, once);
    }

    #[test]
    fn test_illegal_transitions_leave_status() {
        let start = Utc::now();
        let mut closed = record(start, 60, PollStatus::Closed);
        let err = close(&mut closed).unwrap_err();
        assert!(matches!(
            err,
            PollError::InvalidTransition {
                from: PollStatus::Closed,
                to: PollStatus::Closed
            }
        ));
        assert_eq!(closed.status, PollStatus::Closed);

        let mut deleted = record(start, 60, PollStatus::Deleted);
        assert!(delete(&mut deleted).is_err());
        assert!(close(&mut deleted).is_err());
        assert_eq!(deleted.status, PollStatus::Deleted);

        let mut open = record(start, 60, PollStatus::Open);
        delete(&mut open).unwrap();
        assert_eq!(open.status, PollStatus::Deleted);
    }

    #[test]
    fn test_non_voters_keeps_eligible_order() {
        let eligible = [5u64, 3, 9, 3, 1];
        let voters = [9u64, 42];
        assert_eq!(non_voters(&eligible, &voters), vec![5, 3, 1]);
    }

    #[test]
    fn test_validate_appends_default_options() {
        let poll = valid_draft().validate().unwrap();
        assert_eq!(
            poll.options,
            vec!["Blu", "Rosso", "Indifferente", "Contrario a tutte le precedenti"]
        );
        assert_eq!(poll.channel, PlatformRef(99));
        assert_eq!(poll.duration, 3600);
    }

    #[test]
    fn test_validate_rejects_bad_drafts() {
        let cases: Vec<Box<dyn Fn(&mut PollDraft)>> = vec![
            Box::new(|d| d.title = None),
            Box::new(|d| d.title = Some("   ".into())),
            Box::new(|d| d.options.truncate(1)),
            Box::new(|d| d.options = (0..9).map(|i| format!("o{i}")).collect()),
            Box::new(|d| d.options.push(" ".into())),
            Box::new(|d| d.channel = None),
            Box::new(|d| d.majority = Some(101)),
            Box::new(|d| d.quorum = Some(-1)),
            Box::new(|d| d.quorum = None),
            Box::new(|d| d.duration = Some(MAX_DURATION_SECS as i64 + 1)),
            Box::new(|d| d.duration = Some(-1)),
        ];

        for (i, mutate) in cases.iter().enumerate() {
            let mut draft = valid_draft();
            mutate(&mut draft);
            assert!(
                matches!(draft.validate(), Err(PollError::InvalidConfiguration(_))),
                "case {i} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let mut draft = valid_draft();
        draft.options = (0..MAX_OPTIONS).map(|i| format!("o{i}")).collect();
        draft.majority = Some(0);
        draft.quorum = Some(100);
        draft.duration = Some(MAX_DURATION_SECS as i64);
        let poll = draft.validate().unwrap();
        assert_eq!(poll.options.len(), MAX_OPTIONS + DEFAULT_OPTIONS.len());
    }

    #[test]
    fn test_draft_seeded_from_settings() {
        let settings = PollSettings {
            channel: Some(7),
            majority: Some(66),
            quorum: None,
            duration: Some(600),
        };
        let draft = PollDraft::from_settings(&settings);
        assert_eq!(draft.channel, Some(7));
        assert_eq!(draft.majority, Some(66));
        assert_eq!(draft.quorum, None);
        assert!(draft.title.is_none());
    }
}
