//! # Core sink trait
//!
//! `Subscribe` is the delivery sink the hub attaches to its bus. It is called
//! synchronously from `EventBus::publish` (on the publisher's path), so
//! implementations must return quickly: enqueue and let a dedicated task do
//! the slow work. [`QueueSink`](crate::subscribers::QueueSink) is the
//! built-in implementation used for websocket connections.
//!
//! ## Contract
//! - `deliver` must not block and must not call back into the hub's
//!   `ingest`/`attach` (the hub lock is held during delivery).
//! - Returning an error or panicking never affects other subscribers: the bus
//!   logs the fault and moves on.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use reportcast::{BroadcastHub, DeliveryError, HubConfig, Message, Subscribe};
//! use tokio::sync::mpsc;
//!
//! /// Forwards report ids to an audit task without blocking the publisher.
//! struct Audit {
//!     ids: mpsc::UnboundedSender<String>,
//! }
//!
//! impl Subscribe for Audit {
//!     fn deliver(&self, message: &Arc<Message>) -> Result<(), DeliveryError> {
//!         if let Message::NewReport { report } = &**message {
//!             let id = report["id"].as_str().unwrap_or_default().to_string();
//!             self.ids.send(id).map_err(|_| DeliveryError::Closed)?;
//!         }
//!         Ok(())
//!     }
//!     fn name(&self) -> &str { "audit" }
//! }
//!
//! let hub = BroadcastHub::new(HubConfig::default());
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let _audit = hub.attach(Arc::new(Audit { ids: tx })); // replays the cache first
//! tokio::spawn(async move {
//!     while let Some(id) = rx.recv().await {
//!         tracing::info!(report = %id, "audited");
//!     }
//! });
//! ```

use std::sync::Arc;

use crate::error::DeliveryError;
use crate::reports::Message;

/// Contract for bus subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Hands one message to this subscriber.
    ///
    /// # Parameters
    /// - `message`: shared message (cloning the `Arc` is cheap)
    fn deliver(&self, message: &Arc<Message>) -> Result<(), DeliveryError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
