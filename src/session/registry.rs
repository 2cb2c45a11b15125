//! Active-session bookkeeping and single-writer claims on sites.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::SessionError;
use crate::site::{Subsystem, TenantLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Sensor,
    Actuator,
}

/// What the registry knows about one live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub kind: SessionKind,
    pub site: TenantLocation,
    pub subsystem: Option<Subsystem>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    active: HashMap<SessionId, SessionInfo>,
    sensor_claims: HashSet<TenantLocation>,
}

/// Set of live sessions.
///
/// Each site accepts at most one sensor session at a time; actuator
/// sessions only read, so any number may share a site.
#[derive(Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Registers a sensor session and claims `site` for it.
    ///
    /// # Errors
    ///
    /// `SessionError::AlreadyClaimed` if another sensor session holds `site`.
    pub fn register_sensor(&self, site: TenantLocation) -> Result<SessionGuard<'_>, SessionError> {
        let mut inner = self.inner.lock();
        if !inner.sensor_claims.insert(site.clone()) {
            return Err(SessionError::AlreadyClaimed(site));
        }
        let id = self.next_id();
        inner.active.insert(
            id,
            SessionInfo {
                id,
                kind: SessionKind::Sensor,
                site: site.clone(),
                subsystem: None,
                connected_at: Utc::now(),
            },
        );
        Ok(SessionGuard {
            registry: self,
            id,
            claim: Some(site),
        })
    }

    /// Registers an actuator session for `site`/`subsystem`.
    pub fn register_actuator(&self, site: TenantLocation, subsystem: Subsystem) -> SessionGuard<'_> {
        let id = self.next_id();
        self.inner.lock().active.insert(
            id,
            SessionInfo {
                id,
                kind: SessionKind::Actuator,
                site,
                subsystem: Some(subsystem),
                connected_at: Utc::now(),
            },
        );
        SessionGuard {
            registry: self,
            id,
            claim: None,
        }
    }

    fn deregister(&self, id: SessionId, claim: Option<&TenantLocation>) {
        let mut inner = self.inner.lock();
        inner.active.remove(&id);
        if let Some(site) = claim {
            inner.sensor_claims.remove(site);
        }
    }

    /// Live sessions ordered by id.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut out: Vec<SessionInfo> = self.inner.lock().active.values().cloned().collect();
        out.sort_by_key(|s| s.id.0);
        out
    }

    /// Number of live sessions of `kind`.
    pub fn count(&self, kind: SessionKind) -> usize {
        self.inner
            .lock()
            .active
            .values()
            .filter(|s| s.kind == kind)
            .count()
    }
}

/// Keeps a session registered; dropping it deregisters and releases any claim.
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    id: SessionId,
    claim: Option<TenantLocation>,
}

impl SessionGuard<'_> {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.registry.deregister(self.id, self.claim.as_ref());
    }
}
