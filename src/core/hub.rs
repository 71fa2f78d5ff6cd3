//! # BroadcastHub: bounded history + live fan-out.
//!
//! The [`BroadcastHub`] owns the report cache and the event bus and exposes
//! the two operations the transport layer calls:
//!
//! - [`BroadcastHub::ingest`]: a producer submitted a report;
//! - [`BroadcastHub::attach`]: a viewer connected; returns a [`Subscription`].
//!
//! ## Ordering
//! ```text
//! ingest(r):                         attach(sink):
//!   lock ─┐                            lock ─┐
//!         ├─► cache.push(r)                  ├─► replay cache (oldest → newest) to sink
//!         └─► bus.publish(new_report r)      └─► bus.subscribe(sink)
//!   unlock                             unlock
//! ```
//! Both run under the same lock, so for any `attach` racing an `ingest(r)`
//! the sink sees `r` either in the replay or live, never both and never
//! neither (as long as `r` has not been evicted yet).
//!
//! ## Rules
//! - The hub never rejects a report: schema checks happen on the consumer.
//! - Detaching is idempotent and may run concurrently with a publish.
//! - A [`Subscription`] detaches itself when dropped, so every exit path of a
//!   connection releases its registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info};

use crate::core::cache::BoundedCache;
use crate::core::config::HubConfig;
use crate::events::{deliver_isolated, EventBus, SubscriptionId};
use crate::reports::Message;
use crate::subscribers::Subscribe;

/// Report cache plus live fan-out, serialized behind one lock.
pub struct BroadcastHub {
    cfg: HubConfig,
    /// Cached `new_report` messages, oldest first.
    history: Mutex<BoundedCache<Arc<Message>>>,
    bus: EventBus,
}

impl BroadcastHub {
    /// Creates a hub with the given configuration.
    pub fn new(cfg: HubConfig) -> Arc<Self> {
        let capacity = cfg.cache_capacity_clamped();
        Arc::new(Self {
            cfg,
            history: Mutex::new(BoundedCache::new(capacity)),
            bus: EventBus::new(),
        })
    }

    /// Caches `report` and publishes it to every attached subscriber.
    ///
    /// Returns the number of subscribers that accepted the message.
    pub fn ingest(&self, report: Value) -> usize {
        let id = report_id(&report);
        let message = Arc::new(Message::new_report(Arc::new(report)));

        let delivered = {
            let mut history = self.lock();
            history.push(Arc::clone(&message));
            self.bus.publish(&message)
        };

        info!(report = %id, delivered, "report ingested");
        delivered
    }

    /// Replays the cache to `sink`, then subscribes it to live reports.
    ///
    /// The returned [`Subscription`] must be kept alive for as long as the
    /// sink should receive messages.
    pub fn attach(self: &Arc<Self>, sink: Arc<dyn Subscribe>) -> Subscription {
        let name = sink.name().to_string();

        let (id, replayed) = {
            let history = self.lock();
            let mut replayed = 0usize;
            history.for_each(|message| {
                if deliver_isolated(sink.as_ref(), message) {
                    replayed += 1;
                }
            });
            (self.bus.subscribe(sink), replayed)
        };

        info!(subscriber = %name, id = %id, replayed, "subscriber attached");
        Subscription {
            hub: Arc::clone(self),
            id,
            detached: AtomicBool::new(false),
        }
    }

    /// Removes the subscription `id`. Safe to call repeatedly.
    pub fn detach(&self, id: SubscriptionId) -> bool {
        let removed = self.bus.unsubscribe(id);
        if removed {
            debug!(id = %id, "subscriber detached");
        }
        removed
    }

    /// Snapshot of the cached reports, oldest first.
    pub fn cached(&self) -> Vec<Arc<Value>> {
        self.lock()
            .iter()
            .filter_map(|message| match &**message {
                Message::NewReport { report } => Some(Arc::clone(report)),
                Message::Unknown => None,
            })
            .collect()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.bus.len()
    }

    /// Hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, BoundedCache<Arc<Message>>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Detach handle returned by [`BroadcastHub::attach`].
///
/// Dropping it detaches the subscriber.
pub struct Subscription {
    hub: Arc<BroadcastHub>,
    id: SubscriptionId,
    detached: AtomicBool,
}

impl Subscription {
    /// Bus id of this subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detaches now. Later calls (and the eventual drop) are no-ops.
    pub fn detach(&self) {
        if !self.detached.swap(true, Ordering::AcqRel) {
            self.hub.detach(self.id);
        }
    }

    /// True once [`detach`](Self::detach) has run.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

fn report_id(report: &Value) -> String {
    match report.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "<none>".to_string(),
    }
}
