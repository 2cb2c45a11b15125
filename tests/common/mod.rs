//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use site_regulator::cycle::{CycleConfig, CycleScheduler, Regulator};
use site_regulator::error::SessionError;
use site_regulator::inference::FuzzyInference;
use site_regulator::io::MemorySink;
use site_regulator::session::{ActuatorSession, IngestSession, MemoryChannel, SessionChannel};
use site_regulator::site::TenantLocation;
use site_regulator::state::SharedState;
use tokio::task::JoinHandle;

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// The site used throughout the end-to-end tests.
pub fn roof() -> TenantLocation {
    TenantLocation::new("Acme", "Roof").unwrap()
}

/// Shared state, a scheduler over the fuzzy controller, and its sink.
pub fn service() -> (
    Arc<SharedState>,
    CycleScheduler<FuzzyInference, MemorySink>,
    Arc<MemorySink>,
) {
    let shared = SharedState::new(CycleConfig::default());
    let sink = Arc::new(MemorySink::new());
    let scheduler = CycleScheduler::new(
        Arc::clone(&shared),
        Regulator::with_catalogue(FuzzyInference::new()),
        Arc::clone(&sink),
    );
    (shared, scheduler, sink)
}

/// Spawns an ingestion session and sends its handshake.
///
/// Returns the peer end and the session task.
pub async fn connect_sensor(
    shared: &Arc<SharedState>,
    company: &str,
    location: &str,
) -> (MemoryChannel, JoinHandle<Result<(), SessionError>>) {
    let (server, mut client) = MemoryChannel::pair();
    let task = tokio::spawn(IngestSession::new(Arc::clone(shared), server).run());
    client
        .send_text(format!(r#"{{"company":"{company}","location":"{location}"}}"#))
        .await
        .unwrap();
    (client, task)
}

/// Spawns an actuator session for `system_type` and sends its handshake.
pub async fn connect_actuator(
    shared: &Arc<SharedState>,
    company: &str,
    location: &str,
    system_type: &str,
) -> (MemoryChannel, JoinHandle<Result<(), SessionError>>) {
    let (server, mut client) = MemoryChannel::pair();
    let task = tokio::spawn(ActuatorSession::new(Arc::clone(shared), server).run());
    client
        .send_text(format!(
            r#"{{"company":"{company}","location":"{location}","system_type":"{system_type}"}}"#
        ))
        .await
        .unwrap();
    (client, task)
}

/// Next message on `channel`, failing the test after [`WAIT`].
pub async fn recv(channel: &mut MemoryChannel) -> String {
    tokio::time::timeout(WAIT, channel.recv_text())
        .await
        .expect("timed out waiting for a message")
        .unwrap()
        .expect("channel closed")
}

/// Yields until `cond` holds, failing the test after [`WAIT`].
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
