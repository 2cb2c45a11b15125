//! Actuator-facing sessions: push the committed drive level after each cycle.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::channel::SessionChannel;
use crate::error::SessionError;
use crate::site::{Subsystem, TenantLocation, level_for};
use crate::state::SharedState;

/// First message from an actuator controller.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorHandshake {
    pub company: String,
    pub location: String,
    pub system_type: Subsystem,
}

/// Parses and validates an actuator handshake message.
pub fn parse_actuator_handshake(text: &str) -> Result<(TenantLocation, Subsystem), SessionError> {
    let hs: ActuatorHandshake =
        serde_json::from_str(text).map_err(|e| SessionError::Handshake(e.to_string()))?;
    let tl = TenantLocation::new(&hs.company, &hs.location).ok_or_else(|| {
        SessionError::Handshake("company and location must be non-empty".into())
    })?;
    Ok((tl, hs.system_type))
}

/// Wire form of a drive level.
pub fn format_level(level: f64) -> String {
    format!("{level:.2}")
}

/// One long-lived actuator connection.
pub struct ActuatorSession<C> {
    shared: Arc<SharedState>,
    channel: C,
}

impl<C: SessionChannel> ActuatorSession<C> {
    pub fn new(shared: Arc<SharedState>, channel: C) -> Self {
        Self { shared, channel }
    }

    /// Handshakes, then pushes one value per completed cycle.
    ///
    /// Delivery is at most once per cycle: a cycle completed while this
    /// session was still sending is skipped, and only the newest is sent.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let shared = Arc::clone(&self.shared);

        let Some(text) = self.channel.recv_text().await? else {
            return Err(SessionError::Closed);
        };
        let (tl, subsystem) = parse_actuator_handshake(&text)?;
        let guard = shared.sessions.register_actuator(tl.clone(), subsystem);
        info!(session = %guard.id(), site = %tl, %subsystem, "actuator session started");

        let mut complete = shared.hub.subscribe_complete();
        loop {
            tokio::select! {
                changed = complete.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                incoming = self.channel.recv_text() => {
                    match incoming? {
                        Some(text) => {
                            debug!(session = %guard.id(), %text, "ignoring actuator message");
                            continue;
                        }
                        None => {
                            info!(session = %guard.id(), site = %tl, "actuator session closed");
                            return Ok(());
                        }
                    }
                }
            }

            let (cycle, level) = {
                let report = complete.borrow_and_update();
                (report.cycle, level_for(&report.commands, &tl, subsystem))
            };
            self.channel.send_text(format_level(level)).await?;
            debug!(session = %guard.id(), cycle, level, "pushed drive level");
        }
    }
}
