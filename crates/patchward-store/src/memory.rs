//! In-memory store implementation (for engine tests)

use chrono::{DateTime, Duration, Local};
use std::sync::Mutex;

use crate::{DeferralRecord, DeferralStore, StoreResult};

/// In-memory deferral store
#[derive(Default)]
pub struct MemoryDeferralStore {
    record: Mutex<Option<DeferralRecord>>,
}

impl MemoryDeferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a record, as if an earlier run had created it.
    pub fn with_record(record: DeferralRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl DeferralStore for MemoryDeferralStore {
    fn read(&self) -> StoreResult<Option<DeferralRecord>> {
        Ok(self.record.lock().unwrap().clone())
    }

    fn ensure(
        &self,
        now: DateTime<Local>,
        defer_limit_days: u32,
    ) -> StoreResult<DateTime<Local>> {
        let mut record = self.record.lock().unwrap();
        if let Some(existing) = record.as_ref() {
            return Ok(existing.defer_ok_until);
        }
        let defer_ok_until = now + Duration::days(i64::from(defer_limit_days));
        *record = Some(DeferralRecord { defer_ok_until });
        Ok(defer_ok_until)
    }

    fn clear(&self) -> StoreResult<()> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}
