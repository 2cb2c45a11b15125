//! Persistence sink contract and its implementations.

pub mod csv_sink;
pub mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cycle::types::CycleRecord;
use crate::error::SinkError;
use crate::site::TenantLocation;

pub use csv_sink::CsvSink;
pub use memory::MemorySink;

/// Durable store for finalized per-cycle records.
///
/// Calls are blocking; the scheduler runs writes on the blocking pool and
/// never waits for them.
pub trait PersistenceSink: Send + Sync + 'static {
    /// Appends one cycle's records.
    fn write_cycle(&self, records: &[CycleRecord]) -> Result<(), SinkError>;

    /// Last persisted cumulative energy per site.
    fn last_energy(&self) -> Result<HashMap<TenantLocation, f64>, SinkError>;
}

/// Latest cumulative energy per site.
///
/// Records are not assumed to arrive in cycle order: the newest timestamp
/// wins, and on a tie the larger total wins since energy never decreases.
pub(crate) fn last_energy_of<'a>(
    records: impl IntoIterator<Item = &'a CycleRecord>,
) -> HashMap<TenantLocation, f64> {
    let mut latest: HashMap<TenantLocation, (DateTime<Utc>, f64)> = HashMap::new();
    for record in records {
        let Some(tl) = record.tenant_location() else {
            continue;
        };
        let candidate = (record.timestamp, record.cumulative_energy);
        latest
            .entry(tl)
            .and_modify(|best| {
                if candidate.0 > best.0 || (candidate.0 == best.0 && candidate.1 > best.1) {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }
    latest
        .into_iter()
        .map(|(tl, (_, energy))| (tl, energy))
        .collect()
}
