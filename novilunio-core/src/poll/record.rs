//! The persisted shape of a poll.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Ledger key. Starts at 1 and is never reused.
pub type PollId = u64;

/// Lifecycle state of a poll, stored with its Italian label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollStatus {
    #[serde(rename = "*APERTA*")]
    Open,
    #[serde(rename = "*CHIUSA*")]
    Closed,
    #[serde(rename = "*ELIMINATA*")]
    Deleted,
}

impl PollStatus {
    /// Label shown to users and written to the ledger file.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "*APERTA*",
            Self::Closed => "*CHIUSA*",
            Self::Deleted => "*ELIMINATA*",
        }
    }

    /// Only `OPEN -> CLOSED`, `OPEN -> DELETED` and `CLOSED -> DELETED`.
    pub fn can_become(self, next: PollStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Closed) | (Self::Open, Self::Deleted) | (Self::Closed, Self::Deleted)
        )
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Deleted => "DELETED",
        })
    }
}

/// Identifier owned by the chat platform. Stored and compared, never parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformRef(pub u64);

impl PlatformRef {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlatformRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    #[serde(rename = "timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Voting window in seconds.
    #[serde(deserialize_with = "lenient_seconds")]
    pub duration: u64,

    pub quorum: u8,
    pub majority: u8,

    pub channel: PlatformRef,
    pub message: PlatformRef,
    pub thread: PlatformRef,

    pub status: PollStatus,
}

impl PollRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.duration).unwrap_or(i64::MAX);
        self.created_at
            .checked_add_signed(chrono::Duration::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Fields supplied when a poll is registered; the ledger assigns id and status.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub created_at: DateTime<Utc>,
    pub duration: u64,
    pub quorum: u8,
    pub majority: u8,
    pub channel: PlatformRef,
    pub message: PlatformRef,
    pub thread: PlatformRef,
}

impl NewPoll {
    pub(crate) fn into_record(self) -> PollRecord {
        PollRecord {
            created_at: self.created_at,
            duration: self.duration,
            quorum: self.quorum,
            majority: self.majority,
            channel: self.channel,
            message: self.message,
            thread: self.thread,
            status: PollStatus::Open,
        }
    }
}

/// RFC 3339, or an offset-less ISO timestamp read as local time.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| de::Error::custom(format!("timestamp '{raw}' does not exist locally")))
}

/// Whole or fractional non-negative seconds, truncated.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative number of seconds")
        }

        fn visit_u64<E>(self, value: u64) -> Result<u64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<u64, E>
        where
            E: de::Error,
        {
            u64::try_from(value).map_err(|_| E::custom("negative duration"))
        }

        fn visit_f64<E>(self, value: f64) -> Result<u64, E>
        where
            E: de::Error,
        {
            if value.is_finite() && value >= 0.0 {
                Ok(value.trunc() as u64)
            } else {
                Err(E::custom("invalid duration"))
            }
        }
    }

    deserializer.deserialize_any(SecondsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use PollStatus::*;
        assert!(Open.can_become(Closed));
        assert!(Open.can_become(Deleted));
        assert!(Closed.can_become(Deleted));
        for (from, to) in [
            (Closed, Open),
            (Deleted, Open),
            (Deleted, Closed),
            (Open, Open),
            (Closed, Closed),
            (Deleted, Deleted),
        ] {
            assert!(!from.can_become(to), "{from} -> {to} must be illegal");
        }
    }

    #[test]
    fn test_loads_legacy_row() {
        let json = r#"{
            "timestamp": "2024-07-01T18:30:00.123456",
            "duration": 86400.0,
            "quorum": 50,
            "majority": 50,
            "channel": 1260315416505614456,
            "message": 1260315416505614457,
            "thread": 1260315416505614458,
            "status": "*CHIUSA*"
        }"#;
        let record: PollRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.duration, 86_400);
        assert_eq!(record.status, PollStatus::Closed);
        assert_eq!(record.thread, PlatformRef(1260315416505614458));
    }

    #[test]
    fn test_serializes_rfc3339_and_label() {
        let record = NewPoll {
            created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            duration: 60,
            quorum: 10,
            majority: 50,
            channel: PlatformRef(1),
            message: PlatformRef(2),
            thread: PlatformRef(3),
        }
        .into_record();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timestamp"], "2025-01-02T03:04:05Z");
        assert_eq!(value["status"], "*APERTA*");
        assert_eq!(value["channel"], 1);

        let back: PollRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_expiry_boundary() {
        let created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = NewPoll {
            created_at,
            duration: 3600,
            quorum: 0,
            majority: 0,
            channel: PlatformRef(1),
            message: PlatformRef(2),
            thread: PlatformRef(3),
        }
        .into_record();

        assert!(!record.is_expired(created_at + chrono::Duration::seconds(3599)));
        assert!(record.is_expired(created_at + chrono::Duration::seconds(3600)));
    }
}
