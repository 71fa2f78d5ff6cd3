//! # LogWriter: grouped report logger
//!
//! A minimal consumer that logs a one-line summary of each grouped report,
//! followed by one line per top-level group, through `tracing`.
//! Used by `reportcast watch`.
//!
//! ## Example output
//! ```text
//! INFO report id="run-1" created_at=2020-10-05T12:00:00+00:00 status=failed tests=3 failed=1 skipped=1
//! INFO group  report="run-1" group="a" status=failed tests=3
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::consumers::ReportConsumer;
use crate::reports::{GroupStatus, GroupedReport};

/// Report summary writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportConsumer for LogWriter {
    async fn on_report(&self, r: GroupedReport) {
        let root = &r.tests;
        match root.status {
            GroupStatus::Failed | GroupStatus::Unknown => warn!(
                id = %r.id,
                created_at = %r.created_at,
                status = root.status.as_str(),
                tests = root.num_tests,
                failed = root.num_failed,
                skipped = root.num_skipped,
                "report"
            ),
            _ => info!(
                id = %r.id,
                created_at = %r.created_at,
                status = root.status.as_str(),
                tests = root.num_tests,
                failed = root.num_failed,
                skipped = root.num_skipped,
                "report"
            ),
        }
        for g in &root.groups {
            info!(
                report = %r.id,
                group = %g.name,
                status = g.status.as_str(),
                tests = g.num_tests,
                "group"
            );
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
