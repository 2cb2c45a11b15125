//! The periodic aggregation → regulation → dispatch loop.

pub mod aggregate;
pub mod hub;
pub mod regulate;
pub mod scheduler;
pub mod types;

pub use aggregate::Aggregator;
pub use hub::CycleHub;
pub use regulate::Regulator;
pub use scheduler::{CycleScheduler, hydrate_energy};
pub use types::{CycleBuffer, CycleConfig, CycleRecord, CycleReport, SiteSnapshot};
