//! # Report consumer trait
//!
//! `ReportConsumer` is where grouped reports leave the client and enter the
//! owning application's state. The client calls it once per successfully
//! grouped `new_report` message, in stream order.
//!
//! ## Contract
//! - Calls are sequential for one client (never concurrent).
//! - A panic inside `on_report` is caught by the client and logged; the
//!   connection stays open and the next message is processed normally.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use reportcast::{ClientConfig, GroupStatus, GroupedReport, ReconnectingClient, ReportConsumer};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Dashboard;
//!
//! #[async_trait]
//! impl ReportConsumer for Dashboard {
//!     async fn on_report(&self, report: GroupedReport) {
//!         if report.tests.status == GroupStatus::Failed {
//!             tracing::warn!(report = %report.id, failed = report.tests.num_failed, "run failed");
//!         }
//!     }
//!     fn name(&self) -> &'static str { "dashboard" }
//! }
//!
//! let client = ReconnectingClient::websocket(
//!     ClientConfig::new("ws://127.0.0.1:9659/api/stream"),
//!     Arc::new(Dashboard),
//! );
//! client.spawn(CancellationToken::new());
//! ```

use async_trait::async_trait;

use crate::reports::GroupedReport;

/// Contract for the owner of grouped reports.
#[async_trait]
pub trait ReportConsumer: Send + Sync + 'static {
    /// Accepts one grouped report.
    async fn on_report(&self, report: GroupedReport);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
