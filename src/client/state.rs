use std::fmt;

/// Connection state of a [`ReconnectingClient`](crate::ReconnectingClient).
///
/// ```text
/// Disconnected ──► Connecting ──► Connected
///      ▲               │              │
///      └───────────────┴──────────────┘   (failure / close, then fixed delay)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// No connection; waiting for the reconnect delay (or not started).
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Streaming messages from the hub.
    Connected,
}

impl ClientState {
    /// Lowercase label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Disconnected => "disconnected",
            ClientState::Connecting => "connecting",
            ClientState::Connected => "connected",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
