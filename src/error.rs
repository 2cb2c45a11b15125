//! Error types for sessions, persistence, and service startup.

use std::io;

use crate::config::ConfigError;
use crate::site::TenantLocation;

/// Failure on a single session's channel or protocol.
///
/// Always local to that session: the session ends and is deregistered.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Underlying channel failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer sent something that is not a valid handshake.
    #[error("invalid handshake: {0}")]
    Handshake(String),

    /// Another ingestion session already reports for this site.
    #[error("site {0} already has an active sensor session")]
    AlreadyClaimed(TenantLocation),

    /// Peer closed the channel.
    #[error("channel closed by peer")]
    Closed,
}

/// Failure talking to the persistence sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Stored data could not be interpreted.
    #[error("corrupt record at line {line}: {message}")]
    Corrupt { line: u64, message: String },

    /// Sink refused the operation.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Fatal error before the scheduler starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(ConfigError),

    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ConfigError>),

    /// Cumulative energy could not be restored; starting from zero would
    /// silently lose history.
    #[error("energy hydration failed: {0}")]
    Hydration(#[source] SinkError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    /// The scheduler task ended while the server was still running.
    #[error("cycle scheduler stopped unexpectedly")]
    SchedulerStopped,
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        StartupError::Config(e)
    }
}
