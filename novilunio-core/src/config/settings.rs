//! Operator settings persisted as flat JSON objects.
//!
//! Both bots keep a fixed-schema record where every field is optional.
//! Loading is forgiving: unknown keys are ignored, values of the wrong type
//! load as unset, and out-of-range numbers are kept so they can be shown as
//! invalid instead of silently dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::store::{self, StoreError};

/// Default interval between two watch cycles.
pub const DEFAULT_CHECK_EVERY_SECS: u64 = 300;

/// Shortest accepted watch interval.
pub const MIN_CHECK_EVERY_SECS: u64 = 30;

/// Defaults applied to every new poll (`poll_settings.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Channel where polls are launched.
    #[serde(default, deserialize_with = "lenient_id")]
    pub channel: Option<u64>,

    /// Majority threshold in percent.
    #[serde(default, deserialize_with = "lenient_int")]
    pub majority: Option<i64>,

    /// Quorum threshold in percent.
    #[serde(default, deserialize_with = "lenient_int")]
    pub quorum: Option<i64>,

    /// Voting window in seconds.
    #[serde(default, deserialize_with = "lenient_int")]
    pub duration: Option<i64>,
}

/// Settings of the article watcher (`settings.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Channel receiving announcements.
    #[serde(default, deserialize_with = "lenient_id")]
    pub channel: Option<u64>,

    /// Pages watched for new articles.
    #[serde(default, deserialize_with = "lenient_urls")]
    pub urls: Vec<String>,

    /// Role mentioned in announcements and granted by `/arruolami`.
    #[serde(default, deserialize_with = "lenient_id")]
    pub role: Option<u64>,

    /// Seconds between two watch cycles.
    #[serde(default, deserialize_with = "lenient_int")]
    pub check_every: Option<i64>,
}

impl WatchSettings {
    /// Effective cycle interval, falling back to the default when the stored
    /// value is unset or below the minimum.
    pub fn interval(&self) -> Duration {
        let secs = self
            .check_every
            .and_then(|secs| u64::try_from(secs).ok())
            .filter(|secs| *secs >= MIN_CHECK_EVERY_SECS)
            .unwrap_or(DEFAULT_CHECK_EVERY_SECS);
        Duration::from_secs(secs)
    }

    /// Add a URL, returning false when it is already watched.
    pub fn add_url(&mut self, url: &str) -> bool {
        let url = url.trim();
        if self.urls.iter().any(|existing| existing == url) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    /// Remove a URL, returning false when it was not watched.
    pub fn remove_url(&mut self, url: &str) -> bool {
        let url = url.trim();
        let before = self.urls.len();
        self.urls.retain(|existing| existing != url);
        self.urls.len() != before
    }
}

/// A settings record bound to its file.
///
/// Every mutation goes through [`SettingsStore::update`], which edits a copy,
/// persists it and only then replaces the in-memory value.
#[derive(Debug)]
pub struct SettingsStore<T> {
    path: PathBuf,
    current: T,
}

impl<T> SettingsStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Load the record at `path`; missing or corrupt files give the default.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let current = store::load_or_default(&path)?;
        Ok(Self { path, current })
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `edit` to a copy and persist it.
    ///
    /// When `edit` fails or the write fails the stored value is untouched.
    pub fn update<R, E, F>(&mut self, edit: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut next = self.current.clone();
        let result = edit(&mut next)?;
        store::write_json_atomic(&self.path, &next)?;
        self.current = next;
        info!(path = %self.path.display(), "settings saved");
        Ok(result)
    }
}

/// Integer that also accepts fractional numbers (truncated) and numeric
/// strings. Anything else is unset.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value))
}

/// Snowflake-style identifier stored as a number or a string of digits.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// List of URL strings; non-string items are skipped, a non-list is empty.
fn lenient_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_settings_lenient_load() {
        let json = r#"{
            "channel": 123456789012345678,
            "majority": "50",
            "quorum": 33.7,
            "duration": [1, 2],
            "f": "legacy attribute"
        }"#;
        let settings: PollSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.channel, Some(123456789012345678));
        assert_eq!(settings.majority, Some(50));
        assert_eq!(settings.quorum, Some(33));
        assert_eq!(settings.duration, None);
    }

    #[test]
    fn test_out_of_range_is_kept() {
        let settings: PollSettings = serde_json::from_str(r#"{"majority": 150}"#).unwrap();
        assert_eq!(settings.majority, Some(150));
    }

    #[test]
    fn test_null_and_absent_are_unset() {
        let settings: PollSettings = serde_json::from_str(r#"{"channel": null}"#).unwrap();
        assert_eq!(settings, PollSettings::default());
    }

    #[test]
    fn test_watch_settings_urls_and_interval() {
        let json = r#"{
            "channel": "42",
            "urls": ["https://example.com/", 7, "  "],
            "probability": 0.1,
            "check_every": 5
        }"#;
        let settings: WatchSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.channel, Some(42));
        assert_eq!(settings.urls, vec!["https://example.com/".to_string()]);
        assert_eq!(settings.interval(), Duration::from_secs(DEFAULT_CHECK_EVERY_SECS));

        let settings: WatchSettings = serde_json::from_str(r#"{"check_every": 600}"#).unwrap();
        assert_eq!(settings.interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_add_and_remove_url() {
        let mut settings = WatchSettings::default();
        assert!(settings.add_url("https://a.example/"));
        assert!(!settings.add_url(" https://a.example/ "));
        assert!(settings.remove_url("https://a.example/"));
        assert!(!settings.remove_url("https://a.example/"));
        assert!(settings.urls.is_empty());
    }

    #[test]
    fn test_store_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poll_settings.json");

        let mut store = SettingsStore::<PollSettings>::open(&path).unwrap();
        store
            .update(|s| {
                s.majority = Some(60);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let reopened = SettingsStore::<PollSettings>::open(&path).unwrap();
        assert_eq!(reopened.get().majority, Some(60));
    }

    #[test]
    fn test_store_update_rejected_edit_keeps_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = SettingsStore::<WatchSettings>::open(&path).unwrap();
        let result: Result<(), StoreError> = store.update(|s| {
            s.urls.push("https://b.example/".into());
            Err(StoreError::NoDataDir)
        });

        assert!(result.is_err());
        assert!(store.get().urls.is_empty());
        assert!(!path.exists());
    }
}
