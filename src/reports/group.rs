//! # Hierarchical grouping of test results.
//!
//! [`group`] turns a report's flat list of slash-separated test names into a
//! tree of [`TestGroup`]s with per-group counters and a rolled-up status.
//!
//! ## Algorithm
//! ```text
//! Report.tests ──► copy ──► stable sort by name ──► for each test:
//!                                                     split "a/b/t" ─► path ["a","b"], leaf "t"
//!                                                     root ─► "a" ─► "a/b"   (create on first sight)
//!                                                     every node on the walk: count the test once
//!                                                     "a/b".tests.push(test)
//!              ──► status of every group from its own counters
//! ```
//!
//! ## Rules
//! - Group names are full paths (`"a/b"`), the root name is empty.
//! - Children keep first-seen order (which, after sorting, is name order).
//! - `num_tests == num_success + num_failed + num_skipped` for every group.
//! - Status is purely local to a group; every group in the tree gets one.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ReportError;
use crate::reports::report::{check_minversion, CreatedAt, Report, TestResult, TestStatus};

/// Rolled-up status of a [`TestGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    /// No tests counted (only possible for an empty root).
    Unknown,
    /// Every test ran and passed.
    Success,
    /// Every test that ran passed, some were skipped.
    Warning,
    /// At least one test failed.
    Failed,
    /// Every test was skipped.
    Skipped,
}

impl GroupStatus {
    /// Lowercase label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Unknown => "unknown",
            GroupStatus::Success => "success",
            GroupStatus::Warning => "warning",
            GroupStatus::Failed => "failed",
            GroupStatus::Skipped => "skipped",
        }
    }
}

/// One node of the grouped test tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGroup {
    /// Full slash-joined path; empty for the root.
    pub name: String,
    /// Status derived from this group's counters.
    pub status: GroupStatus,
    /// Human-readable explanation of `status`.
    pub status_reason: String,
    /// Tests whose group path ends at this node.
    pub tests: Vec<TestResult>,
    /// Child groups, in first-seen order.
    pub groups: Vec<TestGroup>,
    /// Tests in this group and all descendants.
    pub num_tests: usize,
    /// Tests that ran (success + failed).
    pub num_attempted: usize,
    /// Tests that passed.
    pub num_success: usize,
    /// Tests that failed.
    pub num_failed: usize,
    /// Tests that were skipped.
    pub num_skipped: usize,
}

impl TestGroup {
    fn new(name: String) -> Self {
        Self {
            name,
            status: GroupStatus::Unknown,
            status_reason: String::new(),
            tests: Vec::new(),
            groups: Vec::new(),
            num_tests: 0,
            num_attempted: 0,
            num_success: 0,
            num_failed: 0,
            num_skipped: 0,
        }
    }

    /// Looks up a descendant by its full path (`"a/b"`); the empty path is `self`.
    pub fn find(&self, path: &str) -> Option<&TestGroup> {
        if path == self.name {
            return Some(self);
        }
        self.groups.iter().find_map(|g| {
            let prefix_match = path == g.name
                || (path.starts_with(&g.name) && path[g.name.len()..].starts_with('/'));
            if prefix_match {
                g.find(path)
            } else {
                None
            }
        })
    }

    /// Counts one test against this node.
    fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Success => {
                self.num_success += 1;
                self.num_attempted += 1;
            }
            TestStatus::Failed => {
                self.num_failed += 1;
                self.num_attempted += 1;
            }
            TestStatus::Skipped => self.num_skipped += 1,
        }
        self.num_tests += 1;
    }

    /// Returns the index of the child named `name`, creating it if needed.
    fn child_index(&mut self, name: String) -> usize {
        match self.groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                self.groups.push(TestGroup::new(name));
                self.groups.len() - 1
            }
        }
    }

    /// Derives `status` and `status_reason` for this node only.
    fn update_status(&mut self) {
        let (status, reason) = if self.num_tests == 0 {
            (GroupStatus::Unknown, "No tests were run.")
        } else if self.num_failed > 0 {
            (GroupStatus::Failed, "At least one test failed.")
        } else if self.num_skipped == self.num_tests {
            (GroupStatus::Skipped, "All tests were skipped")
        } else if self.num_skipped > 0 {
            (
                GroupStatus::Warning,
                "All tests which ran passed, but some tests were skipped",
            )
        } else {
            (GroupStatus::Success, "All tests were run and passed.")
        };
        self.status = status;
        self.status_reason = reason.to_string();
    }
}

/// A report whose tests have been grouped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedReport {
    /// Producer-assigned unique identifier.
    pub id: String,
    /// Schema marker the report was submitted with.
    pub minversion: u64,
    /// Parsed creation time.
    pub created_at: CreatedAt,
    /// Root of the grouped test tree.
    pub tests: TestGroup,
    /// Remaining report fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Groups a decoded report.
///
/// Fails with [`ReportError::UnsupportedMinVersion`] without producing any
/// partial tree if the report's schema is too new.
pub fn group(report: &Report) -> Result<GroupedReport, ReportError> {
    check_minversion(report.minversion)?;

    let mut tests = report.tests.clone();
    tests.sort_by(|a, b| compare_names(&a.name, &b.name));

    Ok(GroupedReport {
        id: report.id.clone(),
        minversion: report.minversion,
        created_at: CreatedAt::parse(report.created_at.as_ref()),
        tests: group_tests(tests),
        extra: report.extra.clone(),
    })
}

/// Decodes an opaque report document and groups it.
pub fn group_value(value: Value) -> Result<GroupedReport, ReportError> {
    let report = Report::from_value(value)?;
    group(&report)
}

/// Builds the tree from tests already in display order.
fn group_tests(tests: Vec<TestResult>) -> TestGroup {
    let mut root = TestGroup::new(String::new());

    for test in tests {
        let status = test.status;
        let mut segments: Vec<&str> = test.name.split('/').collect();
        segments.pop();

        let mut node = &mut root;
        node.record(status);
        for segment in segments {
            let name = if node.name.is_empty() {
                segment.to_string()
            } else {
                format!("{}/{}", node.name, segment)
            };
            let idx = node.child_index(name);
            node = &mut node.groups[idx];
            node.record(status);
        }
        node.tests.push(test);
    }

    update_statuses(&mut root);
    root
}

/// Visits every group in the tree (no short-circuit) and sets its status.
fn update_statuses(root: &mut TestGroup) {
    let mut stack = vec![root];
    while let Some(group) = stack.pop() {
        group.update_status();
        stack.extend(group.groups.iter_mut());
    }
}

/// Locale-style comparison: case-insensitive first, exact text breaks ties.
///
/// Total and deterministic; combined with a stable sort, identical names keep
/// their submission order.
fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}
