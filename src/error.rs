//! Error types used by the reportcast hub, grouper, client and server.
//!
//! This module defines one error enum per concern:
//!
//! - [`ReportError`]: a report could not be decoded or grouped (schema errors).
//! - [`DeliveryError`]: a subscriber sink refused a message (subscriber faults).
//! - [`ClientError`]: failures observed by the reconnecting client.
//! - [`ServerError`]: failures of the HTTP collaborator (bind / serve).
//!
//! All types provide `as_label` (stable snake_case label for logs) and
//! `as_message` helpers. None of them is fatal to the process: the hub never
//! rejects an ingest, and the client only logs and moves on.

use std::io;
use thiserror::Error;

/// # Errors produced while decoding or grouping a report.
///
/// Raised on the consumer side only. A report that fails here is dropped by
/// the client and never reaches application state; the hub is unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReportError {
    /// The report declares a schema newer than this consumer understands.
    #[error("unsupported minversion {found} (max supported {supported})")]
    UnsupportedMinVersion {
        /// `minversion` found in the report.
        found: u64,
        /// Highest `minversion` this build can group.
        supported: u64,
    },

    /// A test carries a status other than `success`, `failed` or `skipped`.
    #[error("test {test:?} has unknown status {status:?}")]
    UnknownTestStatus {
        /// Name of the offending test.
        test: String,
        /// Status string as submitted.
        status: String,
    },

    /// The report document does not have the expected shape.
    #[error("malformed report: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ReportError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use reportcast::ReportError;
    ///
    /// let err = ReportError::UnsupportedMinVersion { found: 2, supported: 1 };
    /// assert_eq!(err.as_label(), "report_unsupported_minversion");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReportError::UnsupportedMinVersion { .. } => "report_unsupported_minversion",
            ReportError::UnknownTestStatus { .. } => "report_unknown_test_status",
            ReportError::Malformed(_) => "report_malformed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReportError::UnsupportedMinVersion { found, supported } => {
                format!("cannot parse report, minversion {found} > {supported}")
            }
            ReportError::UnknownTestStatus { test, status } => {
                format!("cannot parse report, test {test:?} has unknown status {status:?}")
            }
            ReportError::Malformed(e) => format!("malformed report: {e}"),
        }
    }
}

/// # Errors returned by a subscriber sink when a message cannot be delivered.
///
/// The [`EventBus`](crate::EventBus) logs and swallows these; they never reach
/// the publisher.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's queue is full; the subscriber has been marked lagged.
    #[error("subscriber queue full")]
    Lagged,

    /// The subscriber's connection is gone.
    #[error("subscriber closed")]
    Closed,
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Lagged => "delivery_lagged",
            DeliveryError::Closed => "delivery_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DeliveryError::Lagged => "subscriber queue full, stream will be closed".to_string(),
            DeliveryError::Closed => "subscriber connection is gone".to_string(),
        }
    }
}

/// # Errors observed by the reconnecting client.
///
/// Transport errors trigger a reconnect; protocol and schema errors drop a
/// single message and keep the connection open.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClientError {
    /// The connection could not be established.
    #[error("connect failed: {error}")]
    Connect {
        /// The underlying error message.
        error: String,
    },

    /// The established connection failed while reading or closing.
    #[error("transport error: {error}")]
    Transport {
        /// The underlying error message.
        error: String,
    },

    /// An inbound frame was not a valid message.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// A `new_report` message carried a report that could not be grouped.
    #[error("schema error: {0}")]
    Schema(#[from] ReportError),
}

impl ClientError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use reportcast::ClientError;
    ///
    /// let err = ClientError::Connect { error: "refused".into() };
    /// assert_eq!(err.as_label(), "client_connect");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::Connect { .. } => "client_connect",
            ClientError::Transport { .. } => "client_transport",
            ClientError::Protocol(_) => "client_protocol",
            ClientError::Schema(_) => "client_schema",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ClientError::Connect { error } => format!("connect: {error}"),
            ClientError::Transport { error } => format!("transport: {error}"),
            ClientError::Protocol(e) => format!("protocol: {e}"),
            ClientError::Schema(e) => e.as_message(),
        }
    }

    /// Indicates whether the error ends the current connection.
    ///
    /// Returns `true` for [`ClientError::Connect`] and [`ClientError::Transport`];
    /// per-message errors (`Protocol`, `Schema`) leave the connection open.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. } | ClientError::Transport { .. }
        )
    }
}

/// # Errors produced by the HTTP server collaborator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: std::net::SocketAddr,
        /// Underlying io error.
        source: io::Error,
    },

    /// The server loop failed.
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),
}

impl ServerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServerError::Bind { .. } => "server_bind",
            ServerError::Serve(_) => "server_serve",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServerError::Bind { addr, source } => format!("bind {addr}: {source}"),
            ServerError::Serve(e) => format!("serve: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ClientError::Connect { error: "x".into() }.is_transport());
        assert!(ClientError::Transport { error: "x".into() }.is_transport());

        let proto = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!ClientError::Protocol(proto).is_transport());

        let schema = ReportError::UnsupportedMinVersion {
            found: 2,
            supported: 1,
        };
        assert!(!ClientError::from(schema).is_transport());
    }

    #[test]
    fn test_schema_message_mentions_versions() {
        let err = ReportError::UnsupportedMinVersion {
            found: 7,
            supported: 1,
        };
        assert_eq!(err.as_message(), "cannot parse report, minversion 7 > 1");
        assert_eq!(
            ClientError::from(err).as_label(),
            "client_schema"
        );
    }
}
