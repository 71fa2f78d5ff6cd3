//! Consumers of grouped reports on the client side.
//!
//! The reconnecting client hands every grouped report to a single
//! [`ReportConsumer`]. Two built-ins are provided:
//!
//! - [`ReportStore`] application state (ordered, deduplicated by report id)
//! - [`LogWriter`] logs a summary of each report
//!
//! ```text
//! ReconnectingClient ──► group_value() ──► ReportConsumer::on_report(GroupedReport)
//!                                               │
//!                                      ┌────────┴────────┐
//!                                      ▼                 ▼
//!                                 ReportStore        LogWriter
//! ```

mod consume;
mod log;
mod store;

pub use consume::ReportConsumer;
pub use log::LogWriter;
pub use store::ReportStore;
