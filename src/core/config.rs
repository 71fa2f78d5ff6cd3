//! # Hub and server configuration.
//!
//! Provides [`HubConfig`] (cache and per-connection queue sizing) and
//! [`ServerConfig`] (listen address plus hub settings).
//!
//! ## Sentinel values
//! - `cache_capacity = 0` → [`MIN_CAPACITY`](crate::core::cache::MIN_CAPACITY) (10)
//! - `queue_capacity` below the cache capacity → raised to the cache capacity,
//!   so a full catch-up replay always fits in a fresh connection's queue

use std::net::{Ipv4Addr, SocketAddr};

use crate::core::cache::MIN_CAPACITY;

/// Default port of the report server.
pub const DEFAULT_PORT: u16 = 9659;

/// Settings of the broadcast hub.
///
/// ## Field semantics
/// - `cache_capacity`: number of most recent reports replayed to new subscribers
/// - `queue_capacity`: per-connection delivery queue length before the
///   connection is considered lagged and closed
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Number of reports kept for catch-up replay.
    pub cache_capacity: usize,
    /// Per-connection delivery queue capacity.
    pub queue_capacity: usize,
}

impl HubConfig {
    /// Returns the cache capacity with `0` replaced by the minimum default.
    #[inline]
    pub fn cache_capacity_clamped(&self) -> usize {
        if self.cache_capacity == 0 {
            MIN_CAPACITY
        } else {
            self.cache_capacity
        }
    }

    /// Returns a queue capacity large enough to hold a full replay.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(self.cache_capacity_clamped()).max(1)
    }
}

impl Default for HubConfig {
    /// Default configuration:
    ///
    /// - `cache_capacity = 50`
    /// - `queue_capacity = 1024`
    fn default() -> Self {
        Self {
            cache_capacity: 50,
            queue_capacity: 1024,
        }
    }
}

/// Settings of the HTTP server that fronts the hub.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen: SocketAddr,
    /// Hub settings.
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    /// Listens on `0.0.0.0:9659` with [`HubConfig::default`].
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            hub: HubConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let cfg = HubConfig {
            cache_capacity: 0,
            queue_capacity: 0,
        };
        assert_eq!(cfg.cache_capacity_clamped(), 10);
        assert_eq!(cfg.queue_capacity_clamped(), 10);

        let cfg = HubConfig {
            cache_capacity: 50,
            queue_capacity: 8,
        };
        assert_eq!(cfg.queue_capacity_clamped(), 50);

        let cfg = HubConfig::default();
        assert_eq!(cfg.cache_capacity_clamped(), 50);
        assert_eq!(cfg.queue_capacity_clamped(), 1024);
    }

    #[test]
    fn test_default_listen_port() {
        assert_eq!(ServerConfig::default().listen.port(), 9659);
    }
}
