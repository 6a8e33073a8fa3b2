//! Error types for the correlation layer.

use thiserror::Error;

/// Local faults that can terminate a pending request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The request carries the reserved zero xid.
    #[error("request has the unassigned (zero) transaction id")]
    UnassignedXid,

    /// The connection closed before the reply arrived.
    #[error("connection closed with the request outstanding")]
    Disconnected,

    /// The process is shutting down.
    #[error("shutting down with the request outstanding")]
    Shutdown,

    /// A codec failure while handling the exchange.
    #[error(transparent)]
    Protocol(#[from] oflow_proto::ProtocolError),
}

/// Convenient Result alias for correlation operations.
pub type Result<T> = std::result::Result<T, CoreError>;
