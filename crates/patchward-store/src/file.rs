//! JSON-file store implementation
//!
//! The record is a single JSON document written atomically (temp file in
//! the target directory, then rename) so a crash mid-write can never leave
//! a partial record behind.

use chrono::{DateTime, Duration, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{DeferralRecord, DeferralStore, StoreResult};

/// File-backed deferral store
pub struct FileDeferralStore {
    path: PathBuf,
}

impl FileDeferralStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record: &DeferralRecord) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(record)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::fs::write(tmp.path(), &json)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), "Deferral record written");
        Ok(())
    }
}

impl DeferralStore for FileDeferralStore {
    fn read(&self) -> StoreResult<Option<DeferralRecord>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Fail open: a corrupt record grants a fresh grace period
                // rather than crashing the run.
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Deferral record unreadable, treating as absent"
                );
                Ok(None)
            }
        }
    }

    fn ensure(
        &self,
        now: DateTime<Local>,
        defer_limit_days: u32,
    ) -> StoreResult<DateTime<Local>> {
        if let Some(record) = self.read()? {
            debug!(
                ok_until = %patchward_util::format_datetime_full(&record.defer_ok_until),
                "Existing deferral deadline"
            );
            return Ok(record.defer_ok_until);
        }

        let defer_ok_until = now + Duration::days(i64::from(defer_limit_days));
        self.write_record(&DeferralRecord { defer_ok_until })?;
        info!(
            ok_until = %patchward_util::format_datetime_full(&defer_ok_until),
            "Created deferral record"
        );
        Ok(defer_ok_until)
    }

    fn clear(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed deferral record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store_in(dir: &tempfile::TempDir) -> FileDeferralStore {
        FileDeferralStore::new(dir.path().join("deferral.json"))
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn absent_record_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.read().unwrap().is_none());
        assert!(!store.is_deferral_still_allowed(noon()).unwrap());
    }

    #[test]
    fn ensure_sets_deadline_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = store.ensure(noon(), 3).unwrap();
        assert_eq!(first, noon() + Duration::days(3));

        // A later run with a different "now" must not move the deadline.
        let second = store.ensure(noon() + Duration::hours(7), 3).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn deferral_flips_exactly_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let deadline = store.ensure(noon(), 1).unwrap();
        assert!(store
            .is_deferral_still_allowed(deadline - Duration::seconds(1))
            .unwrap());
        assert!(!store.is_deferral_still_allowed(deadline).unwrap());
        assert!(!store
            .is_deferral_still_allowed(deadline + Duration::seconds(1))
            .unwrap());
    }

    #[test]
    fn clear_removes_the_record_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.ensure(noon(), 3).unwrap();
        assert!(store.read().unwrap().is_some());

        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_record_is_treated_as_absent_and_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), b"{ not json").unwrap();
        assert!(store.read().unwrap().is_none());

        let deadline = store.ensure(noon(), 3).unwrap();
        assert_eq!(deadline, noon() + Duration::days(3));
        assert_eq!(store.read().unwrap().unwrap().defer_ok_until, deadline);
    }

    #[test]
    fn record_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let written = store.ensure(noon(), 14).unwrap();

        let reopened = store_in(&dir);
        let record = reopened.read().unwrap().unwrap();
        assert_eq!(record.defer_ok_until, written);
    }
}
