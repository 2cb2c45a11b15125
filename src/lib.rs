//! Multi-tenant environmental regulation service.
//!
//! Sensor sites stream readings over long-lived sessions; a fixed-period
//! scheduler aggregates them, integrates energy, infers actuator drive
//! levels, persists per-site records, and pushes the committed levels to
//! actuator controllers.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod cycle;
pub mod error;
pub mod inference;
pub mod io;
pub mod session;
pub mod site;
pub mod state;
