//! # reportcast
//!
//! **Reportcast** carries test run reports from the producers that submit
//! them to any number of live viewers.
//!
//! The hub keeps the most recent reports in a bounded cache, replays them to
//! every viewer that connects, and then streams new reports as they arrive.
//! Viewers group each report's flat `suite/sub/test` results into a tree with
//! per-group counters and a rolled-up status.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer                producer
//!      │ POST /api/publish_report │
//!      ▼                          ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  BroadcastHub                                                 │
//! │  ├─ BoundedCache<Message>   (last N reports, oldest first)    │
//! │  └─ EventBus                (ordered, fault-isolated fan-out) │
//! └──────┬──────────────────────────┬──────────────────────┬──────┘
//!        ▼                          ▼                      ▼
//!   QueueSink (stream-1)       QueueSink (stream-2)     QueueSink (stream-N)
//!        │ bounded queue            │                      │
//!        ▼                          ▼                      ▼
//!   GET /api/stream            GET /api/stream          GET /api/stream
//!        │ {"type":"new_report","report":{...}}
//!        ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  ReconnectingClient                                           │
//! │  Disconnected ─► Connecting ─► Connected   (fixed 1s delay)   │
//! │  frame ─► decode ─► group ─► ReportConsumer::on_report        │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                ▼
//!                    ReportStore / LogWriter / ...
//! ```
//!
//! ### Attach vs. ingest
//! ```text
//! attach(sink):  lock ─► replay cache to sink ─► subscribe sink ─► unlock
//! ingest(r):     lock ─► cache.push(r)        ─► publish r       ─► unlock
//! ```
//! A viewer therefore sees every report exactly once: from the replay if it
//! was ingested before the attach, live otherwise.
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Hub**           | Bounded history plus live fan-out.                        | [`BroadcastHub`], [`Subscription`]          |
//! | **Subscribers**   | Per-connection sinks with bounded queues.                 | [`Subscribe`], [`QueueSink`]                |
//! | **Grouping**      | Flat results to a status tree.                            | [`group`], [`TestGroup`], [`GroupStatus`]   |
//! | **Client**        | Stream consumer with a fixed reconnect delay.             | [`ReconnectingClient`], [`ClientHandle`]    |
//! | **Consumers**     | Where grouped reports end up.                             | [`ReportConsumer`], [`ReportStore`]         |
//! | **Server**        | axum routes for publishing and streaming.                 | [`server::router`], [`server::serve`]       |
//! | **Errors**        | Typed errors per concern.                                 | [`ReportError`], [`ClientError`]            |
//! | **Configuration** | Hub, server and client settings.                          | [`HubConfig`], [`ServerConfig`], [`ClientConfig`] |
//!
//! ## Example
//! ```rust
//! use reportcast::{group_value, BroadcastHub, GroupStatus, HubConfig};
//! use serde_json::json;
//!
//! let hub = BroadcastHub::new(HubConfig::default());
//! hub.ingest(json!({
//!     "id": "run-1",
//!     "minversion": 1,
//!     "tests": [
//!         { "name": "net/dial", "status": "success" },
//!         { "name": "net/tls", "status": "failed" },
//!         { "name": "disk/fsync", "status": "skipped" }
//!     ]
//! }));
//!
//! let cached = hub.cached();
//! let report = group_value((*cached[0]).clone()).unwrap();
//! assert_eq!(report.tests.status, GroupStatus::Failed);
//! assert_eq!(report.tests.find("net").unwrap().num_failed, 1);
//! assert_eq!(report.tests.find("disk").unwrap().status, GroupStatus::Skipped);
//! ```
mod client;
mod consumers;
mod core;
mod error;
mod events;
mod reports;
mod subscribers;

pub mod server;

// ---- Public re-exports ----

pub use client::{
    decode_frame, ClientConfig, ClientHandle, ClientState, Connection, Connector,
    ReconnectingClient, WsConnection, WsConnector, DEFAULT_RECONNECT_DELAY,
};
pub use consumers::{LogWriter, ReportConsumer, ReportStore};
pub use core::{
    wait_for_shutdown_signal, BoundedCache, BroadcastHub, HubConfig, ServerConfig, Subscription,
    DEFAULT_PORT, MIN_CAPACITY,
};
pub use error::{ClientError, DeliveryError, ReportError, ServerError};
pub use events::{EventBus, SubscriptionId};
pub use reports::{
    group, group_value, CreatedAt, GroupStatus, GroupedReport, Message, Report, TestGroup,
    TestResult, TestStatus, SUPPORTED_MINVERSION,
};
pub use subscribers::{QueueSink, SinkReceiver, Subscribe};
