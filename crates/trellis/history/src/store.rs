//! Historic instance store: retention, batched cleanup, and reporting
//!
//! The store answers two recurring operational questions: which
//! finished instances may be removed now, and how much cleanable
//! history each definition has accumulated. Both take the current time
//! as an explicit parameter — the store never reads the ambient clock,
//! which keeps cleanup decisions reproducible in tests.

use crate::errors::{HistoryError, HistoryResult};
use crate::instance::{HistoricInstanceState, HistoricProcessInstance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_types::{DefinitionId, ExecutionId, ProcessDefinition};

/// Per-definition aggregation of finished and cleanable instances
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CleanableInstanceReportResult {
    pub definition_id: DefinitionId,
    pub definition_key: String,
    pub definition_name: String,
    pub definition_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_time_to_live: Option<u32>,
    pub finished_count: u64,
    pub cleanable_count: u64,
}

/// In-memory store of historic process instances
#[derive(Clone, Debug, Default)]
pub struct HistoryStore {
    instances: HashMap<ExecutionId, HistoricProcessInstance>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    // ── Recording ────────────────────────────────────────────────────

    /// Open a historic record for a started instance
    pub fn record_started(
        &mut self,
        definition: &ProcessDefinition,
        instance_id: ExecutionId,
        start_time: DateTime<Utc>,
    ) {
        let record = HistoricProcessInstance::started(definition, instance_id.clone(), start_time);
        self.instances.insert(instance_id, record);
    }

    /// Close the record of a finished instance
    pub fn record_finished(
        &mut self,
        id: &ExecutionId,
        state: HistoricInstanceState,
        end_time: DateTime<Utc>,
    ) -> HistoryResult<()> {
        let record = self
            .instances
            .get_mut(id)
            .ok_or_else(|| HistoryError::NotFound(id.clone()))?;
        if record.is_finished() {
            return Err(HistoryError::AlreadyFinished(id.clone()));
        }
        record.finish(state, end_time);
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn find_by_id(&self, id: &ExecutionId) -> Option<&HistoricProcessInstance> {
        self.instances.get(id)
    }

    pub fn count(&self) -> usize {
        self.instances.len()
    }

    // ── Deletion ─────────────────────────────────────────────────────

    /// Delete one historic record
    pub fn delete_by_id(&mut self, id: &ExecutionId) -> HistoryResult<()> {
        self.instances
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| HistoryError::NotFound(id.clone()))
    }

    /// Delete a batch of historic records. Ids without a record are
    /// skipped; the number actually removed is returned.
    pub fn delete_by_ids(&mut self, ids: &[ExecutionId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.instances.remove(id).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(requested = ids.len(), removed, "Historic instances deleted");
        removed
    }

    // ── Cleanup ──────────────────────────────────────────────────────

    /// Ids of instances whose retention has elapsed at `now`, oldest
    /// end time first, at most `batch_size` of them.
    pub fn find_ids_for_cleanup(
        &self,
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Vec<ExecutionId> {
        let mut cleanable: Vec<&HistoricProcessInstance> = self
            .instances
            .values()
            .filter(|record| record.cleanable_at(now))
            .collect();
        cleanable.sort_by_key(|record| (record.end_time, record.id.clone()));
        cleanable
            .into_iter()
            .take(batch_size)
            .map(|record| record.id.clone())
            .collect()
    }

    /// Finished and cleanable instance counts per definition version
    pub fn finished_instance_report(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<CleanableInstanceReportResult> {
        let mut by_definition: HashMap<DefinitionId, CleanableInstanceReportResult> =
            HashMap::new();
        for record in self.instances.values().filter(|r| r.is_finished()) {
            let entry = by_definition
                .entry(record.definition.clone())
                .or_insert_with(|| CleanableInstanceReportResult {
                    definition_id: record.definition.clone(),
                    definition_key: record.definition_key.clone(),
                    definition_name: record.definition_name.clone(),
                    definition_version: record.definition_version,
                    history_time_to_live: record.history_time_to_live,
                    finished_count: 0,
                    cleanable_count: 0,
                });
            entry.finished_count += 1;
            if record.cleanable_at(now) {
                entry.cleanable_count += 1;
            }
        }

        let mut report: Vec<CleanableInstanceReportResult> =
            by_definition.into_values().collect();
        report.sort_by(|a, b| {
            (&a.definition_key, a.definition_version).cmp(&(&b.definition_key, b.definition_version))
        });
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::Activity;

    fn make_definition(key: &str, ttl: Option<u32>) -> ProcessDefinition {
        let mut def = ProcessDefinition::new(key).with_history_time_to_live(ttl);
        def.add_activity(Activity::task("work")).unwrap();
        def
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn make_store() -> HistoryStore {
        // order: ttl 5 days, three finished instances with staggered
        // end times plus one still running. archive: no ttl, one
        // finished instance.
        let order = make_definition("order", Some(5));
        let archive = make_definition("archive", None);
        let mut store = HistoryStore::new();

        for (id, end) in [
            ("order-1", "2024-03-02T08:00:00Z"),
            ("order-2", "2024-03-04T08:00:00Z"),
            ("order-3", "2024-03-06T08:00:00Z"),
        ] {
            store.record_started(&order, ExecutionId::new(id), ts("2024-03-01T08:00:00Z"));
            store
                .record_finished(
                    &ExecutionId::new(id),
                    HistoricInstanceState::Completed,
                    ts(end),
                )
                .unwrap();
        }
        store.record_started(
            &order,
            ExecutionId::new("order-4"),
            ts("2024-03-01T08:00:00Z"),
        );

        store.record_started(
            &archive,
            ExecutionId::new("archive-1"),
            ts("2024-03-01T08:00:00Z"),
        );
        store
            .record_finished(
                &ExecutionId::new("archive-1"),
                HistoricInstanceState::Cancelled,
                ts("2024-03-02T08:00:00Z"),
            )
            .unwrap();

        store
    }

    #[test]
    fn test_record_lifecycle() {
        let mut store = HistoryStore::new();
        let def = make_definition("order", Some(5));
        store.record_started(
            &def,
            ExecutionId::new("instance-1"),
            ts("2024-03-01T08:00:00Z"),
        );

        assert_eq!(store.count(), 1);
        assert!(!store
            .find_by_id(&ExecutionId::new("instance-1"))
            .unwrap()
            .is_finished());

        store
            .record_finished(
                &ExecutionId::new("instance-1"),
                HistoricInstanceState::Completed,
                ts("2024-03-02T08:00:00Z"),
            )
            .unwrap();
        let record = store.find_by_id(&ExecutionId::new("instance-1")).unwrap();
        assert_eq!(record.state, HistoricInstanceState::Completed);

        // Finishing twice is a caller bug.
        let again = store.record_finished(
            &ExecutionId::new("instance-1"),
            HistoricInstanceState::Completed,
            ts("2024-03-03T08:00:00Z"),
        );
        assert!(matches!(again, Err(HistoryError::AlreadyFinished(_))));
    }

    #[test]
    fn test_record_finished_unknown() {
        let mut store = HistoryStore::new();
        let result = store.record_finished(
            &ExecutionId::new("ghost"),
            HistoricInstanceState::Completed,
            ts("2024-03-02T08:00:00Z"),
        );
        assert!(matches!(result, Err(HistoryError::NotFound(_))));
    }

    #[test]
    fn test_delete_by_id() {
        let mut store = make_store();
        store.delete_by_id(&ExecutionId::new("order-1")).unwrap();
        assert!(store.find_by_id(&ExecutionId::new("order-1")).is_none());

        let missing = store.delete_by_id(&ExecutionId::new("order-1"));
        assert!(matches!(missing, Err(HistoryError::NotFound(_))));
    }

    #[test]
    fn test_delete_by_ids_skips_missing() {
        let mut store = make_store();
        let removed = store.delete_by_ids(&[
            ExecutionId::new("order-1"),
            ExecutionId::new("ghost"),
            ExecutionId::new("order-2"),
        ]);
        assert_eq!(removed, 2);
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_cleanup_respects_ttl_and_batch_size() {
        let store = make_store();

        // At March 8th, only order-1 (ended March 2nd + 5 days) is due.
        let due = store.find_ids_for_cleanup(10, ts("2024-03-08T08:00:00Z"));
        assert_eq!(due, vec![ExecutionId::new("order-1")]);

        // Two weeks on, all finished order instances are due, oldest
        // end time first; archive-1 never qualifies (no ttl) and
        // order-4 never qualifies (still running).
        let due = store.find_ids_for_cleanup(10, ts("2024-03-20T08:00:00Z"));
        assert_eq!(
            due,
            vec![
                ExecutionId::new("order-1"),
                ExecutionId::new("order-2"),
                ExecutionId::new("order-3"),
            ]
        );

        // The batch size truncates from the front of the queue.
        let due = store.find_ids_for_cleanup(2, ts("2024-03-20T08:00:00Z"));
        assert_eq!(
            due,
            vec![ExecutionId::new("order-1"), ExecutionId::new("order-2")]
        );
    }

    #[test]
    fn test_finished_instance_report() {
        let store = make_store();
        let report = store.finished_instance_report(ts("2024-03-08T08:00:00Z"));

        assert_eq!(report.len(), 2);

        let archive = &report[0];
        assert_eq!(archive.definition_key, "archive");
        assert_eq!(archive.finished_count, 1);
        assert_eq!(archive.cleanable_count, 0);
        assert_eq!(archive.history_time_to_live, None);

        let order = &report[1];
        assert_eq!(order.definition_key, "order");
        // order-4 is still running and does not count as finished.
        assert_eq!(order.finished_count, 3);
        assert_eq!(order.cleanable_count, 1);
        assert_eq!(order.history_time_to_live, Some(5));
    }

    #[test]
    fn test_report_on_empty_store() {
        let store = HistoryStore::new();
        assert!(store.finished_instance_report(ts("2024-03-08T08:00:00Z")).is_empty());
        assert!(store
            .find_ids_for_cleanup(10, ts("2024-03-08T08:00:00Z"))
            .is_empty());
    }
}
