//! # Bus subscribers (hub side).
//!
//! This module provides the [`Subscribe`] sink trait and the built-in
//! [`QueueSink`] used for every streaming connection.
//!
//! ## Architecture
//! ```text
//! ingest ── publish(Message) ──► EventBus ──► Subscribe::deliver(&Arc<Message>)
//!                                                   │
//!                                       ┌───────────┼───────────┐
//!                                       ▼           ▼           ▼
//!                                  QueueSink    QueueSink    Custom
//!                                  (conn 1)     (conn 2)      ...
//! ```

mod queue;
mod subscribe;

pub use queue::{QueueSink, SinkReceiver};
pub use subscribe::Subscribe;
