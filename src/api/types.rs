//! API response types.
//!
//! Reading keys use the same column names as the persisted record log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cycle::types::SiteSnapshot;
use crate::session::SessionInfo;
use crate::site::{CommandSet, TenantLocation};

/// `GET /` body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
}

/// State of one site as of the latest completed cycle.
#[derive(Debug, Serialize)]
pub struct SiteView {
    pub tenant: String,
    pub location: String,
    /// Running energy total (kWh).
    pub cumulative_energy: f64,
    /// Whether the site reported in the latest cycle.
    pub reported: bool,
    /// Present readings from the latest cycle, keyed by column name.
    pub readings: BTreeMap<&'static str, f64>,
    /// Readings the site did not supply in the latest cycle.
    pub missing: Vec<&'static str>,
    /// Committed drive level per subsystem.
    pub commands: CommandSet,
}

impl SiteView {
    pub fn new(
        tl: &TenantLocation,
        snapshot: Option<&SiteSnapshot>,
        cumulative_energy: f64,
        commands: CommandSet,
    ) -> Self {
        let (readings, missing) = match snapshot {
            Some(s) => (
                s.reading.present().map(|(f, v)| (f.name(), v)).collect(),
                s.missing.iter().map(|f| f.name()).collect(),
            ),
            None => (BTreeMap::new(), Vec::new()),
        };
        Self {
            tenant: tl.organization.clone(),
            location: tl.site.clone(),
            cumulative_energy,
            reported: snapshot.is_some(),
            readings,
            missing,
            commands,
        }
    }
}

/// `GET /sites` body.
#[derive(Debug, Serialize)]
pub struct SitesResponse {
    /// Latest completed cycle; zero before the first boundary.
    pub cycle: u64,
    pub completed_at: DateTime<Utc>,
    pub sites: Vec<SiteView>,
}

/// `GET /sessions` body.
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sensors: usize,
    pub actuators: usize,
    pub active: Vec<SessionInfo>,
}

/// Error body for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
