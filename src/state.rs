//! State shared by the scheduler, the session managers, and the API.

use std::sync::Arc;

use crate::cycle::hub::CycleHub;
use crate::cycle::types::CycleConfig;
use crate::session::SessionRegistry;
use crate::site::{PendingTable, SiteStateStore};

/// Everything many tasks touch concurrently.
///
/// Wrapped in `Arc` once at startup; each field does its own locking.
pub struct SharedState {
    pub config: CycleConfig,
    pub pending: PendingTable,
    pub store: SiteStateStore,
    pub hub: CycleHub,
    pub sessions: SessionRegistry,
}

impl SharedState {
    pub fn new(config: CycleConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            pending: PendingTable::new(),
            store: SiteStateStore::new(),
            hub: CycleHub::new(),
            sessions: SessionRegistry::new(),
        })
    }
}
