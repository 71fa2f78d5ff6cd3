//! # In-memory application state of grouped reports.
//!
//! [`ReportStore`] keeps every grouped report a client has received, in
//! arrival order, with one entry per report id.
//!
//! ## Rules
//! - `add_report` removes any existing report with the same id and appends
//!   the new one at the end. A catch-up replay after a reconnect therefore
//!   refreshes entries instead of duplicating them.
//! - Every change bumps a revision counter observable through [`ReportStore::changes`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::consumers::ReportConsumer;
use crate::reports::GroupedReport;

/// Ordered, id-deduplicated list of grouped reports.
pub struct ReportStore {
    reports: Mutex<Vec<GroupedReport>>,
    revision: watch::Sender<u64>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            reports: Mutex::new(Vec::new()),
            revision,
        }
    }

    /// Adds a report, replacing (and moving to the end) any report with the same id.
    pub fn add_report(&self, report: GroupedReport) {
        {
            let mut reports = self.lock();
            if let Some(idx) = reports.iter().position(|r| r.id == report.id) {
                reports.remove(idx);
            }
            reports.push(report);
        }
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Snapshot of all reports, oldest first.
    pub fn reports(&self) -> Vec<GroupedReport> {
        self.lock().clone()
    }

    /// Ids of all reports, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.id.clone()).collect()
    }

    /// Returns the report with the given id.
    pub fn get(&self, id: &str) -> Option<GroupedReport> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Number of stored reports.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no report has been stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Receiver that observes the revision counter (bumped on every change).
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GroupedReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReportConsumer for ReportStore {
    async fn on_report(&self, report: GroupedReport) {
        self.add_report(report);
    }

    fn name(&self) -> &'static str {
        "report-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::group_value;
    use serde_json::json;

    fn grouped(id: &str, client: &str) -> GroupedReport {
        group_value(json!({"id": id, "minversion": 1, "client": client, "tests": []})).unwrap()
    }

    #[test]
    fn test_same_id_replaces_and_moves_to_end() {
        let store = ReportStore::new();
        store.add_report(grouped("a", "v1"));
        store.add_report(grouped("b", "v1"));
        store.add_report(grouped("a", "v2"));

        assert_eq!(store.ids(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(
            store.get("a").unwrap().extra.get("client"),
            Some(&json!("v2"))
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_revision_bumps_on_each_add() {
        let store = ReportStore::new();
        let mut changes = store.changes();
        assert!(store.is_empty());

        store.on_report(grouped("a", "x")).await;
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 1);

        store.on_report(grouped("a", "y")).await;
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 2);
        assert_eq!(store.len(), 1);
    }
}
