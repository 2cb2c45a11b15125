//! Sensor-facing sessions: one reading batch per site per cycle.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::channel::SessionChannel;
use crate::error::SessionError;
use crate::site::{ReadingBatch, SensorReport, TenantLocation};
use crate::state::SharedState;

/// Message sent to the sensor when a window opens.
pub const READ_REQUEST: &str = "read";

/// First message from a sensor site.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorHandshake {
    pub company: String,
    pub location: String,
}

impl SensorHandshake {
    pub fn tenant_location(&self) -> Result<TenantLocation, SessionError> {
        TenantLocation::new(&self.company, &self.location)
            .ok_or_else(|| SessionError::Handshake("company and location must be non-empty".into()))
    }
}

/// Parses and validates a sensor handshake message.
pub fn parse_sensor_handshake(text: &str) -> Result<TenantLocation, SessionError> {
    let hs: SensorHandshake =
        serde_json::from_str(text).map_err(|e| SessionError::Handshake(e.to_string()))?;
    hs.tenant_location()
}

/// One long-lived sensor connection.
pub struct IngestSession<C> {
    shared: Arc<SharedState>,
    channel: C,
}

impl<C: SessionChannel> IngestSession<C> {
    pub fn new(shared: Arc<SharedState>, channel: C) -> Self {
        Self { shared, channel }
    }

    /// Handshakes, then answers one read request per ingestion window until
    /// the peer disconnects.
    ///
    /// The channel is watched between windows too, so a peer that goes away
    /// releases its site claim right away.
    ///
    /// Returns `Ok(())` on a clean close. Any error ends only this session.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let shared = Arc::clone(&self.shared);

        let Some(text) = self.channel.recv_text().await? else {
            return Err(SessionError::Closed);
        };
        let tl = parse_sensor_handshake(&text)?;

        let guard = match shared.sessions.register_sensor(tl.clone()) {
            Ok(guard) => guard,
            Err(e) => {
                let reply = serde_json::json!({ "error": e.to_string() }).to_string();
                let _ = self.channel.send_text(reply).await;
                return Err(e);
            }
        };
        info!(session = %guard.id(), site = %tl, "sensor session started");

        let mut window = shared.hub.subscribe_window();
        loop {
            tokio::select! {
                changed = window.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                incoming = self.channel.recv_text() => {
                    match incoming? {
                        Some(text) => {
                            debug!(session = %guard.id(), %text, "ignoring unsolicited sensor message");
                            continue;
                        }
                        None => {
                            info!(session = %guard.id(), site = %tl, "sensor session closed");
                            return Ok(());
                        }
                    }
                }
            }
            let cycle = *window.borrow_and_update();

            self.channel.send_text(READ_REQUEST.to_string()).await?;
            let Some(text) = self.channel.recv_text().await? else {
                info!(session = %guard.id(), site = %tl, "sensor session closed");
                return Ok(());
            };

            match serde_json::from_str::<SensorReport>(&text) {
                Ok(report) => {
                    let batch = ReadingBatch::from_report(&report);
                    if shared.pending.submit(tl.clone(), batch) {
                        debug!(site = %tl, cycle, "replaced uncommitted batch");
                    }
                }
                Err(e) => {
                    warn!(site = %tl, cycle, error = %e, "malformed sensor report skipped");
                }
            }
        }
    }
}
