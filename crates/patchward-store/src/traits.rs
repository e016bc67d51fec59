//! Store trait definitions

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// The persisted deferral record: one field, the deadline until which a
/// user may postpone a restart-requiring update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferralRecord {
    /// Absolute deadline. Fixed when the record is created; later runs
    /// never extend it.
    pub defer_ok_until: DateTime<Local>,
}

/// Single-record deferral store.
///
/// `now` is passed in by the caller so every decision is reproducible in
/// tests; implementations never consult the wall clock themselves.
pub trait DeferralStore: Send + Sync {
    /// Read the current record, if any. An unreadable or corrupt backing
    /// store is reported as absent, not as an error: the policy fails open
    /// to a fresh grace period.
    fn read(&self) -> StoreResult<Option<DeferralRecord>>;

    /// Return the deadline, creating the record with
    /// `now + defer_limit_days` if none exists. An existing deadline is
    /// returned unchanged.
    fn ensure(&self, now: DateTime<Local>, defer_limit_days: u32)
        -> StoreResult<DateTime<Local>>;

    /// True iff `now` is strictly before the recorded deadline. Absent
    /// record means no deferral is allowed.
    fn is_deferral_still_allowed(&self, now: DateTime<Local>) -> StoreResult<bool> {
        Ok(self
            .read()?
            .is_some_and(|record| now < record.defer_ok_until))
    }

    /// Delete the record, resetting the grace period for the next
    /// restart-requiring update. Deleting an absent record succeeds.
    fn clear(&self) -> StoreResult<()>;
}
