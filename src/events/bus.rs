//! # In-process publish/subscribe bus.
//!
//! [`EventBus`] maps subscription ids to [`Subscribe`] sinks and delivers each
//! published message synchronously, in subscription order, to every sink
//! registered at the moment `publish` starts.
//!
//! ## Architecture
//! ```text
//! subscribe(sink) ──► id ──► slots: [ (id1, sink1, active) , (id2, sink2, active) , … ]
//!
//! publish(msg):
//!   snapshot slots (under lock) ──► for each slot (lock released):
//!                                      active? ──► catch_unwind(sink.deliver(msg))
//!                                                     ├─ Ok           → delivered
//!                                                     ├─ Err(e)       → warn, continue
//!                                                     └─ panic        → error, continue
//! ```
//!
//! ## Rules
//! - **Snapshot at publish**: sinks added during a publish miss that publish.
//! - **Removal guard**: unsubscribing clears the slot's `active` flag, so a
//!   sink removed mid-publish is not invoked for the rest of it.
//! - **Idempotent unsubscribe**: unknown or already-removed ids are a no-op.
//! - **Fault isolation**: a failing or panicking sink never stops delivery to
//!   the sinks after it; the fault is logged and swallowed.
//!
//! ## Panic handling
//! `AssertUnwindSafe` is used around `deliver`; a sink that panics while
//! holding its own locks may leave its own state poisoned, never the bus's.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, trace, warn};

use crate::reports::Message;
use crate::subscribers::Subscribe;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One registered sink.
struct Slot {
    id: SubscriptionId,
    sink: Arc<dyn Subscribe>,
    active: AtomicBool,
}

/// Synchronous fan-out bus.
///
/// ### Properties
/// - **Ordered**: sinks are invoked in subscription order.
/// - **Bounded**: `publish` runs in time proportional to the number of sinks
///   (as long as sinks honour the non-blocking contract).
/// - **Thread-safe**: `subscribe`/`unsubscribe` may race with `publish`;
///   delivery-or-not to a concurrently removed sink is the only nondeterminism.
pub struct EventBus {
    next_id: AtomicU64,
    slots: Mutex<Vec<Arc<Slot>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Registers `sink`; it receives every message published from now on.
    pub fn subscribe(&self, sink: Arc<dyn Subscribe>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Arc::new(Slot {
            id,
            sink,
            active: AtomicBool::new(true),
        }));
        id
    }

    /// Removes exactly the sink registered under `id`.
    ///
    /// Returns `true` if something was removed; calling again (or with an
    /// unknown id) returns `false` and does nothing else.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut slots = self.lock();
        match slots.iter().position(|s| s.id == id) {
            Some(idx) => {
                let slot = slots.remove(idx);
                slot.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Delivers `message` to every sink subscribed when the call starts.
    ///
    /// Returns the number of sinks that accepted the message.
    pub fn publish(&self, message: &Arc<Message>) -> usize {
        let snapshot: Vec<Arc<Slot>> = self.lock().clone();
        let mut delivered = 0;

        for slot in snapshot {
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            if deliver_isolated(slot.sink.as_ref(), message) {
                delivered += 1;
            }
        }
        trace!(kind = message.as_label(), delivered, "published");
        delivered
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delivers one message to one sink, logging and swallowing any fault.
///
/// Returns `true` if the sink accepted the message.
pub(crate) fn deliver_isolated(sink: &dyn Subscribe, message: &Arc<Message>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(message))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(subscriber = sink.name(), label = e.as_label(), "delivery failed");
            false
        }
        Err(panic_err) => {
            error!(
                subscriber = sink.name(),
                info = %panic_message(&*panic_err),
                "subscriber panicked"
            );
            false
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
