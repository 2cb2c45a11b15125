//! Shared per-site state: pending ingestion, cumulative energy, commands.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::command::CommandSnapshot;
use super::reading::ReadingBatch;
use super::shard::ShardedMap;
use super::TenantLocation;

/// Reading batches received since the last cycle boundary.
#[derive(Default)]
pub struct PendingTable {
    batches: ShardedMap<TenantLocation, ReadingBatch>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the latest batch for `tl`, replacing any uncommitted one.
    ///
    /// Returns `true` if an earlier batch from this cycle was overwritten.
    pub fn submit(&self, tl: TenantLocation, batch: ReadingBatch) -> bool {
        self.batches.insert(tl, batch).is_some()
    }

    /// Takes every pending batch; each batch is handed out exactly once.
    pub fn drain(&self) -> Vec<(TenantLocation, ReadingBatch)> {
        self.batches.drain()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Cumulative energy and committed command sets, keyed by site.
///
/// Energy is written only by the aggregation step. Commands are
/// copy-on-write: readers clone an `Arc` and never see a half-applied cycle.
#[derive(Default)]
pub struct SiteStateStore {
    energy_kwh: ShardedMap<TenantLocation, f64>,
    commands: RwLock<Arc<CommandSnapshot>>,
}

impl SiteStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds cumulative energy from persisted totals.
    pub fn hydrate(&self, totals: HashMap<TenantLocation, f64>) {
        for (tl, kwh) in totals {
            if kwh.is_finite() && kwh >= 0.0 {
                self.energy_kwh.insert(tl, kwh);
            } else {
                warn!(site = %tl, kwh, "ignoring invalid persisted energy total");
            }
        }
    }

    /// Cumulative energy for `tl` (kWh), zero if never observed.
    pub fn energy_kwh(&self, tl: &TenantLocation) -> f64 {
        self.energy_kwh.get(tl).unwrap_or(0.0)
    }

    /// Adds `delta_kwh` to the running total and returns the new total.
    ///
    /// Negative or non-finite deltas leave the total unchanged.
    pub fn add_energy(&self, tl: &TenantLocation, delta_kwh: f64) -> f64 {
        let delta = if delta_kwh.is_finite() && delta_kwh > 0.0 {
            delta_kwh
        } else {
            0.0
        };
        self.energy_kwh.update_or_insert(
            tl.clone(),
            || 0.0,
            |total| {
                *total += delta;
                *total
            },
        )
    }

    /// Every known cumulative energy total.
    pub fn energy_snapshot(&self) -> HashMap<TenantLocation, f64> {
        self.energy_kwh.snapshot()
    }

    /// The last committed command sets.
    pub fn commands(&self) -> Arc<CommandSnapshot> {
        Arc::clone(&self.commands.read())
    }

    /// Publishes a new command snapshot in one swap.
    pub fn commit_commands(&self, snapshot: Arc<CommandSnapshot>) {
        *self.commands.write() = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{CommandSet, Field, Subsystem};

    fn acme() -> TenantLocation {
        TenantLocation::new("Acme", "Roof").unwrap()
    }

    #[test]
    fn pending_last_write_wins_and_drains_once() {
        let pending = PendingTable::new();
        let mut first = ReadingBatch::default();
        first.set(Field::Temperature, Some(20.0));
        let mut second = ReadingBatch::default();
        second.set(Field::Temperature, Some(22.0));

        assert!(!pending.submit(acme(), first));
        assert!(pending.submit(acme(), second));

        let drained = pending.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1.get(Field::Temperature), Some(22.0));
        assert!(pending.is_empty());
        assert!(pending.drain().is_empty());
    }

    #[test]
    fn energy_accumulates_from_hydrated_value() {
        let store = SiteStateStore::new();
        store.hydrate(HashMap::from([(acme(), 12.5)]));
        assert_eq!(store.add_energy(&acme(), 0.5), 13.0);
        assert_eq!(store.energy_kwh(&acme()), 13.0);
    }

    #[test]
    fn energy_ignores_negative_and_nan_deltas() {
        let store = SiteStateStore::new();
        store.add_energy(&acme(), 1.0);
        assert_eq!(store.add_energy(&acme(), -0.5), 1.0);
        assert_eq!(store.add_energy(&acme(), f64::NAN), 1.0);
    }

    #[test]
    fn hydrate_skips_invalid_totals() {
        let store = SiteStateStore::new();
        let other = TenantLocation::new("Acme", "Cellar").unwrap();
        store.hydrate(HashMap::from([(acme(), f64::NAN), (other.clone(), 3.0)]));
        assert_eq!(store.energy_kwh(&acme()), 0.0);
        assert_eq!(store.energy_kwh(&other), 3.0);
    }

    #[test]
    fn committed_commands_replace_whole_snapshot() {
        let store = SiteStateStore::new();
        let before = store.commands();
        assert!(before.is_empty());

        let mut set = CommandSet::default();
        set.set(Subsystem::Heater, 55.0);
        store.commit_commands(Arc::new(HashMap::from([(acme(), set)])));

        assert!(before.is_empty());
        assert_eq!(store.commands()[&acme()].level(Subsystem::Heater), 55.0);
    }
}
