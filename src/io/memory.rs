//! In-process sink for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{PersistenceSink, last_energy_of};
use crate::cycle::types::CycleRecord;
use crate::error::SinkError;
use crate::site::TenantLocation;

/// Keeps every written record in memory.
///
/// Writes and reads can be made to fail to exercise error paths.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<CycleRecord>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-loaded with records, as if from an earlier run.
    pub fn with_records(records: Vec<CycleRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Copy of every stored record.
    pub fn records(&self) -> Vec<CycleRecord> {
        self.records.lock().clone()
    }

    /// Number of successful `write_cycle` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PersistenceSink for MemorySink {
    fn write_cycle(&self, records: &[CycleRecord]) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("writes disabled".into()));
        }
        self.records.lock().extend_from_slice(records);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn last_energy(&self) -> Result<HashMap<TenantLocation, f64>, SinkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("reads disabled".into()));
        }
        Ok(last_energy_of(self.records.lock().iter()))
    }
}
