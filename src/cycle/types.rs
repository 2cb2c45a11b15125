//! Core cycle types: timing, the per-cycle buffer, and persisted records.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::site::{CommandSnapshot, Field, ReadingBatch, TenantLocation};

/// Watts × seconds in one kilowatt-hour.
const JOULES_PER_KWH: f64 = 1000.0 * 3600.0;

/// Timing parameters shared by the scheduler and the energy integrator.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use site_regulator::cycle::types::CycleConfig;
///
/// let cfg = CycleConfig::new(Duration::from_secs(3));
/// assert!((cfg.energy_delta_kwh(1000.0) - 0.000_833).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleConfig {
    /// Length of one cycle.
    pub period: Duration,
}

impl CycleConfig {
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero(), "cycle period must be > 0");
        Self { period }
    }

    /// Energy (kWh) drawn at `power_w` watts over one period.
    pub fn energy_delta_kwh(&self, power_w: f64) -> f64 {
        power_w * self.period.as_secs_f64() / JOULES_PER_KWH
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

/// One site's merged state for the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSnapshot {
    pub reading: ReadingBatch,
    /// Running total after this cycle's integration (kWh).
    pub cumulative_energy_kwh: f64,
    /// Fields still missing after the merge.
    pub missing: Vec<Field>,
}

/// Per-cycle buffer, rebuilt from scratch every cycle.
///
/// Only sites that reported since the previous boundary are present.
pub type CycleBuffer = BTreeMap<TenantLocation, SiteSnapshot>;

/// What the scheduler publishes when a cycle completes.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Monotonic cycle counter; zero means no cycle has run yet.
    pub cycle: u64,
    pub completed_at: DateTime<Utc>,
    pub buffer: Arc<CycleBuffer>,
    pub commands: Arc<CommandSnapshot>,
}

impl CycleReport {
    /// Report published before the first cycle.
    pub fn initial() -> Self {
        Self {
            cycle: 0,
            completed_at: Utc::now(),
            buffer: Arc::new(CycleBuffer::new()),
            commands: Arc::new(CommandSnapshot::new()),
        }
    }
}

/// Finalized per-site record handed to the persistence sink.
///
/// Missing fields stay `None` and serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub tenant: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub o2: Option<f64>,
    pub voc: Option<f64>,
    pub renewable_energy: Option<f64>,
    pub avg_power: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub power_factor: Option<f64>,
    pub cumulative_energy: f64,
}

impl CycleRecord {
    pub fn new(tl: &TenantLocation, snapshot: &SiteSnapshot, timestamp: DateTime<Utc>) -> Self {
        let r = &snapshot.reading;
        Self {
            tenant: tl.organization.clone(),
            location: tl.site.clone(),
            timestamp,
            temperature: r.get(Field::Temperature),
            humidity: r.get(Field::Humidity),
            co2: r.get(Field::Co2),
            o2: r.get(Field::O2),
            voc: r.get(Field::Voc),
            renewable_energy: r.get(Field::RenewableEnergy),
            avg_power: r.get(Field::InstantaneousPower),
            soil_moisture: r.get(Field::SoilMoisture),
            power_factor: r.get(Field::PowerFactor),
            cumulative_energy: snapshot.cumulative_energy_kwh,
        }
    }

    /// Site key, or `None` for a record with blank identity.
    pub fn tenant_location(&self) -> Option<TenantLocation> {
        TenantLocation::new(&self.tenant, &self.location)
    }
}

/// Records for every site in `buffer`, stamped with `timestamp`.
pub fn records_for(buffer: &CycleBuffer, timestamp: DateTime<Utc>) -> Vec<CycleRecord> {
    buffer
        .iter()
        .map(|(tl, snap)| CycleRecord::new(tl, snap, timestamp))
        .collect()
}
