//! # Bounded per-connection delivery queue.
//!
//! [`QueueSink`] is the bus-facing half: `deliver` is a non-blocking
//! `try_send` into a bounded FIFO. [`SinkReceiver`] is the drain half, owned
//! by the connection's writer task.
//!
//! ## Architecture
//! ```text
//! EventBus::publish
//!     │
//!     ├──► QueueSink 1 ──try_send──► [queue 1] ──► writer task 1 ──► socket 1
//!     ├──► QueueSink 2 ──try_send──► [queue 2] ──► writer task 2 ──► socket 2
//!     └──► QueueSink N ──try_send──► [queue N] ──► writer task N ──► socket N
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: messages come out in publish order.
//! - **Non-blocking**: `deliver()` never awaits.
//! - **Overflow ends the stream**: on a full queue the sink is marked lagged,
//!   every later delivery is refused, and the receiver yields `None` right away.
//!   The connection is then closed and the viewer reconnects and catches up
//!   through replay, so a gap is never silently skipped.
//! - **Isolation**: one full or closed queue does not affect other sinks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DeliveryError;
use crate::reports::Message;
use crate::subscribers::Subscribe;

/// Bus-facing half of a per-connection queue.
pub struct QueueSink {
    name: String,
    sender: mpsc::Sender<Arc<Message>>,
    lagged: CancellationToken,
}

/// Drain half of a per-connection queue.
pub struct SinkReceiver {
    receiver: mpsc::Receiver<Arc<Message>>,
    lagged: CancellationToken,
}

impl QueueSink {
    /// Creates a linked sink/receiver pair.
    ///
    /// ### Notes
    /// - Minimum capacity is 1 (enforced).
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, SinkReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let lagged = CancellationToken::new();
        let sink = Self {
            name: name.into(),
            sender,
            lagged: lagged.clone(),
        };
        (sink, SinkReceiver { receiver, lagged })
    }

    /// True once an overflow has been observed.
    pub fn is_lagged(&self) -> bool {
        self.lagged.is_cancelled()
    }
}

impl Subscribe for QueueSink {
    fn deliver(&self, message: &Arc<Message>) -> Result<(), DeliveryError> {
        if self.lagged.is_cancelled() {
            return Err(DeliveryError::Lagged);
        }
        match self.sender.try_send(Arc::clone(message)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.lagged.cancel();
                Err(DeliveryError::Lagged)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::Closed),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl SinkReceiver {
    /// Receives the next message in publish order.
    ///
    /// Returns `None` when the sink has lagged (even if messages remain
    /// queued) or when the sink side has been dropped and the queue drained.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        tokio::select! {
            biased;
            _ = self.lagged.cancelled() => None,
            msg = self.receiver.recv() => msg,
        }
    }

    /// True once the sink has overflowed.
    pub fn is_lagged(&self) -> bool {
        self.lagged.is_cancelled()
    }
}
