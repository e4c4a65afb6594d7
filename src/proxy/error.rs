//! Error types for probing and pooling

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Why a single proxy failed its probe.
///
/// These are values carried on a [`ProbeResult`](crate::ProbeResult), never
/// errors returned to the caller of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The proxy address is not a usable URL.
    #[error("invalid proxy URL: {0}")]
    InvalidAddress(String),
    /// DNS, connect, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(String),
    /// The endpoint answered with something other than 200.
    #[error("HTTP {0}")]
    UnexpectedStatus(u16),
    #[error("failed to read response: {0}")]
    BodyRead(String),
    /// The body was not an IPv4 or IPv6 literal.
    #[error("invalid IP response")]
    InvalidPayload,
}

/// Classification of a [`ProbeError`] without its details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    InvalidAddress,
    TransportFailure,
    UnexpectedStatus,
    BodyReadFailure,
    InvalidPayload,
}

impl ProbeError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeError::InvalidAddress(_) => ProbeErrorKind::InvalidAddress,
            ProbeError::Transport(_) => ProbeErrorKind::TransportFailure,
            ProbeError::UnexpectedStatus(_) => ProbeErrorKind::UnexpectedStatus,
            ProbeError::BodyRead(_) => ProbeErrorKind::BodyReadFailure,
            ProbeError::InvalidPayload => ProbeErrorKind::InvalidPayload,
        }
    }
}

impl Serialize for ProbeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProbeError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Failure of a whole pool run.
///
/// Individual proxy failures never show up here; only a broken worker pool does.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{count} worker task(s) failed: {first}")]
    WorkerFailed {
        count: usize,
        first: tokio::task::JoinError,
    },
    #[error("pool supervisor failed: {0}")]
    Supervisor(#[source] tokio::task::JoinError),
}
