//! Hub core: report history, fan-out and process lifecycle.
//!
//! Internal modules:
//! - [`cache`]: bounded FIFO history of the most recent reports;
//! - [`config`]: hub and server sizing;
//! - [`hub`]: [`BroadcastHub`], the cache and bus behind one lock;
//! - [`shutdown`]: termination signal handling for the binary.

pub(crate) mod cache;
pub(crate) mod config;
mod hub;
mod shutdown;

pub use cache::{BoundedCache, MIN_CAPACITY};
pub use config::{HubConfig, ServerConfig, DEFAULT_PORT};
pub use hub::{BroadcastHub, Subscription};
pub use shutdown::wait_for_shutdown_signal;
