//! Report data model and the grouping algorithm.
//!
//! ## Contents
//! - [`Report`], [`TestResult`], [`TestStatus`], [`CreatedAt`] consumer-side document types
//! - [`Message`] tagged wire/bus payload (`{"type":"new_report","report":…}`)
//! - [`group`] / [`group_value`] flat results → [`TestGroup`] tree ([`GroupedReport`])
//!
//! ## Quick reference
//! - **Hub side** never decodes reports: it carries `Message<Arc<Value>>`.
//! - **Client side** decodes `Message<Value>`, then [`group_value`] checks the
//!   schema version and builds the tree.

mod group;
mod message;
mod report;

pub use group::{group, group_value, GroupStatus, GroupedReport, TestGroup};
pub use message::Message;
pub use report::{CreatedAt, Report, TestResult, TestStatus, SUPPORTED_MINVERSION};
