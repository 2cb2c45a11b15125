//! Per-site identity, readings, and shared mutable state.

pub mod command;
pub mod reading;
pub mod shard;
pub mod store;
pub mod tenant;

pub use command::{CommandSet, CommandSnapshot, Subsystem, level_for};
pub use reading::{Field, ReadingBatch, SensorReport, power_factor};
pub use shard::ShardedMap;
pub use store::{PendingTable, SiteStateStore};
pub use tenant::TenantLocation;
