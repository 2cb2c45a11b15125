//! Ingestion and actuator session managers.
//!
//! Each connection runs as its own task and only ever suspends on its own
//! channel or on a cycle broadcast, so a stalled peer stalls nobody else.

pub mod actuator;
pub mod channel;
pub mod ingest;
pub mod registry;

pub use actuator::{ActuatorSession, format_level, parse_actuator_handshake};
pub use channel::{MemoryChannel, SessionChannel};
pub use ingest::{IngestSession, READ_REQUEST, parse_sensor_handshake};
pub use registry::{SessionGuard, SessionId, SessionInfo, SessionKind, SessionRegistry};
