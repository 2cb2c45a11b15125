//! Text-message channel abstraction under every session.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::SessionError;

/// A bidirectional, message-framed text channel owned by one session.
pub trait SessionChannel: Send {
    /// Next text message, or `Ok(None)` once the peer has closed.
    fn recv_text(&mut self) -> impl Future<Output = Result<Option<String>, SessionError>> + Send;

    /// Sends one text message.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// In-process channel end; see [`MemoryChannel::pair`].
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryChannel {
    /// Two connected ends: what one sends the other receives.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: b_rx },
            Self { tx: b_tx, rx: a_rx },
        )
    }
}

impl SessionChannel for MemoryChannel {
    async fn recv_text(&mut self) -> Result<Option<String>, SessionError> {
        Ok(self.rx.recv().await)
    }

    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.tx.send(text).map_err(|_| SessionError::Closed)
    }
}
