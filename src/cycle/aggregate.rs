//! Aggregation and energy integration: pending batches → per-cycle buffer.

use tracing::{debug, warn};

use super::types::{CycleBuffer, CycleConfig, SiteSnapshot};
use crate::site::{Field, PendingTable, SiteStateStore};

/// Folds the batches received since the last boundary into a fresh buffer
/// and advances each reporting site's cumulative energy.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    config: CycleConfig,
}

impl Aggregator {
    pub fn new(config: CycleConfig) -> Self {
        Self { config }
    }

    /// Consumes every pending batch and returns the new buffer.
    ///
    /// Sites with no pending batch are absent from the result and their
    /// energy total is untouched. A missing or negative power reading adds
    /// nothing to the total.
    pub fn aggregate(&self, pending: &PendingTable, store: &SiteStateStore) -> CycleBuffer {
        let mut buffer = CycleBuffer::new();

        for (tl, reading) in pending.drain() {
            let delta_kwh = match reading.get(Field::InstantaneousPower) {
                Some(power_w) if power_w >= 0.0 => self.config.energy_delta_kwh(power_w),
                Some(power_w) => {
                    warn!(site = %tl, power_w, "negative power reading, no energy integrated");
                    0.0
                }
                None => 0.0,
            };
            let cumulative_energy_kwh = store.add_energy(&tl, delta_kwh);

            let missing = reading.missing();
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
                warn!(site = %tl, missing = ?names, "fields missing after merge");
            }
            debug!(site = %tl, delta_kwh, cumulative_energy_kwh, "integrated energy");

            buffer.insert(
                tl,
                SiteSnapshot {
                    reading,
                    cumulative_energy_kwh,
                    missing,
                },
            );
        }

        buffer
    }
}
