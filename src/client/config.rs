//! # Reconnecting client configuration.
//!
//! ## Sentinel values
//! - `reconnect_delay = 0s` → reconnect immediately (tests / local tooling)
//! - `state_history = 0` → clamped to 1

use std::time::Duration;

/// Default delay between a connection loss and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Settings of a [`ReconnectingClient`](crate::ReconnectingClient).
///
/// ## Field semantics
/// - `url`: websocket URL of the hub's stream endpoint (`ws://host:9659/api/stream`)
/// - `reconnect_delay`: fixed wait after every failure; never grows, never gives up
/// - `state_history`: how many state transitions a lagging
///   [`ClientHandle::transitions`](crate::ClientHandle::transitions) receiver may fall behind
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Stream endpoint URL.
    pub url: String,
    /// Fixed delay before each reconnect.
    pub reconnect_delay: Duration,
    /// Capacity of the transition broadcast channel.
    pub state_history: usize,
}

impl ClientConfig {
    /// Creates a config for `url` with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns the transition history capacity clamped to a minimum of 1.
    #[inline]
    pub fn state_history_clamped(&self) -> usize {
        self.state_history.max(1)
    }
}

impl Default for ClientConfig {
    /// Default configuration:
    ///
    /// - `url = ws://127.0.0.1:9659/api/stream`
    /// - `reconnect_delay = 1s`
    /// - `state_history = 64`
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9659/api/stream".to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            state_history: 64,
        }
    }
}
