//! In-process publish/subscribe.
//!
//! ## Contents
//! - [`EventBus`] synchronous, ordered, fault-isolating fan-out to [`Subscribe`](crate::Subscribe) sinks
//! - [`SubscriptionId`] token returned by `subscribe`, consumed by `unsubscribe`
//!
//! ## Quick reference
//! - **Publisher**: `BroadcastHub::ingest` (one `new_report` per ingested report).
//! - **Subscribers**: one [`QueueSink`](crate::QueueSink) per streaming connection,
//!   registered by `BroadcastHub::attach` after the catch-up replay.

mod bus;

pub(crate) use bus::{deliver_isolated, panic_message};
pub use bus::{EventBus, SubscriptionId};
