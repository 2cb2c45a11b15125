//! `SessionChannel` over an upgraded axum WebSocket.

use axum::extract::ws::{Message, WebSocket};
use tracing::debug;

use crate::error::SessionError;
use crate::session::SessionChannel;

impl SessionChannel for WebSocket {
    async fn recv_text(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            match self.recv().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                // ping/pong are answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}
