//! Persistent, append-only poll ledger (`poll_history.json`).
//!
//! The file is a JSON object keyed by poll id. Rows are never removed, so the
//! next id is always the current maximum plus one. Every mutation runs on a
//! copy of the map which replaces the live one only after it hit the disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use super::PollError;
use super::engine;
use super::record::{NewPoll, PlatformRef, PollId, PollRecord, PollStatus};
use crate::store::{self, StoreError};

/// Entries per history page.
pub const LEDGER_PAGE_SIZE: usize = 10;

#[derive(Debug)]
pub struct PollLedger {
    path: PathBuf,
    records: BTreeMap<PollId, PollRecord>,
}

impl PollLedger {
    /// Open the ledger at `path`. A missing or malformed file gives an
    /// empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records: BTreeMap<PollId, PollRecord> = store::load_or_default(&path)?;
        info!(path = %path.display(), polls = records.len(), "poll ledger loaded");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_id(&self) -> PollId {
        self.records.keys().next_back().map_or(1, |max| max + 1)
    }

    /// Append a new open poll and return its id.
    pub fn register(&mut self, poll: NewPoll) -> Result<PollId, PollError> {
        let id = self.next_id();
        let mut next = self.records.clone();
        next.insert(id, poll.into_record());
        self.commit(next)?;
        info!(poll_id = id, "poll registered");
        Ok(id)
    }

    pub fn get(&self, id: PollId) -> Result<&PollRecord, PollError> {
        self.records.get(&id).ok_or(PollError::NotFound(id))
    }

    /// Apply a status change under the transition rules and persist it.
    pub fn set_status(&mut self, id: PollId, status: PollStatus) -> Result<(), PollError> {
        let mut next = self.records.clone();
        let record = next.get_mut(&id).ok_or(PollError::NotFound(id))?;
        engine::transition(record, status)?;
        self.commit(next)?;
        info!(poll_id = id, status = %status, "poll status updated");
        Ok(())
    }

    pub fn close(&mut self, id: PollId) -> Result<(), PollError> {
        self.set_status(id, PollStatus::Closed)
    }

    pub fn delete(&mut self, id: PollId) -> Result<(), PollError> {
        self.set_status(id, PollStatus::Deleted)
    }

    /// Close expired polls; writes only when at least one changed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Result<usize, PollError> {
        let mut next = self.records.clone();
        let changed = engine::sweep_expired(next.values_mut(), now);
        if changed > 0 {
            self.commit(next)?;
            info!(closed = changed, "expired polls closed");
        }
        Ok(changed)
    }

    /// The poll whose discussion thread is `thread`.
    pub fn find_by_thread(&self, thread: PlatformRef) -> Option<(PollId, &PollRecord)> {
        self.records
            .iter()
            .find(|(_, record)| record.thread == thread)
            .map(|(id, record)| (*id, record))
    }

    /// `len` records starting at position `start`, in id order.
    pub fn page(&self, start: usize, len: usize) -> Vec<(PollId, &PollRecord)> {
        self.records
            .iter()
            .skip(start)
            .take(len)
            .map(|(id, record)| (*id, record))
            .collect()
    }

    /// Number of pages of `page_size` entries, at least one.
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 1;
        }
        self.records.len().div_ceil(page_size).max(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PollId, &PollRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    fn commit(&mut self, next: BTreeMap<PollId, PollRecord>) -> Result<(), StoreError> {
        store::write_json_atomic(&self.path, &next)?;
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_poll(thread: u64, duration: u64) -> NewPoll {
        NewPoll {
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
            duration,
            quorum: 50,
            majority: 50,
            channel: PlatformRef(1),
            message: PlatformRef(thread + 1000),
            thread: PlatformRef(thread),
        }
    }

    fn open_in(dir: &tempfile::TempDir) -> PollLedger {
        PollLedger::open(dir.path().join("poll_history.json")).unwrap()
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_in(&dir);
        assert_eq!(ledger.register(new_poll(1, 60)).unwrap(), 1);
        assert_eq!(ledger.register(new_poll(2, 60)).unwrap(), 2);
        assert_eq!(ledger.get(2).unwrap().status, PollStatus::Open);
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_in(&dir);
        ledger.register(new_poll(1, 60)).unwrap();
        ledger.delete(1).unwrap();
        assert_eq!(ledger.register(new_poll(2, 60)).unwrap(), 2);
        assert_eq!(ledger.get(1).unwrap().status, PollStatus::Deleted);
    }

    #[test]
    fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_in(&dir);
        assert!(matches!(ledger.get(3), Err(PollError::NotFound(3))));
    }

    #[test]
    fn test_illegal_status_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_in(&dir);
        ledger.register(new_poll(1, 60)).unwrap();
        ledger.close(1).unwrap();

        assert!(matches!(
            ledger.set_status(1, PollStatus::Open),
            Err(PollError::InvalidTransition { .. })
        ));
        assert!(matches!(ledger.close(1), Err(PollError::InvalidTransition { .. })));

        let reopened = open_in(&dir);
        assert_eq!(reopened.get(1).unwrap().status, PollStatus::Closed);
    }

    #[test]
    fn test_sweep_writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_in(&dir);
        ledger.register(new_poll(1, 60)).unwrap();
        ledger.register(new_poll(2, 86_400)).unwrap();

        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 1, 0).unwrap();
        assert_eq!(ledger.sweep(now).unwrap(), 1);
        assert_eq!(ledger.sweep(now).unwrap(), 0);
        assert_eq!(ledger.get(1).unwrap().status, PollStatus::Closed);
        assert_eq!(ledger.get(2).unwrap().status, PollStatus::Open);
    }

    #[test]
    fn test_find_by_thread_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_in(&dir);
        for thread in 1..=12 {
            ledger.register(new_poll(thread, 60)).unwrap();
        }

        let (id, record) = ledger.find_by_thread(PlatformRef(7)).unwrap();
        assert_eq!(id, 7);
        assert_eq!(record.message, PlatformRef(1007));
        assert!(ledger.find_by_thread(PlatformRef(99)).is_none());

        assert_eq!(ledger.page_count(LEDGER_PAGE_SIZE), 2);
        let second = ledger.page(LEDGER_PAGE_SIZE, LEDGER_PAGE_SIZE);
        assert_eq!(second.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![11, 12]);
    }

    #[test]
    fn test_failed_write_leaves_ledger_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let mut ledger = PollLedger::open(data.join("poll_history.json")).unwrap();
        ledger.register(new_poll(1, 60)).unwrap();

        // Replace the data directory with a plain file so writes fail.
        std::fs::remove_dir_all(&data).unwrap();
        std::fs::write(&data, "not a directory").unwrap();

        assert!(matches!(
            ledger.register(new_poll(2, 60)),
            Err(PollError::Store(_))
        ));
        assert!(ledger.delete(1).is_err());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(1).unwrap().status, PollStatus::Open);
        assert_eq!(ledger.next_id(), 2);
    }
}
