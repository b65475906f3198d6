//! User operation log: the append-only audit trail
//!
//! Every user-triggered structural operation produces exactly one
//! entry. Instruction-level detail is carried in the describe() text of
//! the instructions, not as separate entries per instruction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_types::ExecutionId;

/// The kind of operation an entry records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    ModifyProcessInstance,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModifyProcessInstance => write!(f, "ModifyProcessInstance"),
        }
    }
}

/// One recorded property mutation, possibly empty for operations that
/// change structure rather than properties
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl PropertyChange {
    pub fn new(
        property: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            property: property.into(),
            old_value,
            new_value,
        }
    }

    /// Placeholder for operations without property-level detail
    pub fn empty() -> Self {
        Self {
            property: String::new(),
            old_value: None,
            new_value: None,
        }
    }
}

/// One audit entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub id: String,
    pub operation: OperationType,
    pub process_instance: ExecutionId,
    pub property_changes: Vec<PropertyChange>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit sink
#[derive(Clone, Debug, Default)]
pub struct OperationLog {
    entries: Vec<OperationLogEntry>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append one entry for a process-instance operation
    pub fn log_process_instance_operation(
        &mut self,
        operation: OperationType,
        process_instance: ExecutionId,
        property_changes: Vec<PropertyChange>,
    ) {
        tracing::debug!(%operation, %process_instance, "Operation logged");
        self.entries.push(OperationLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            operation,
            process_instance,
            property_changes,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[OperationLogEntry] {
        &self.entries
    }

    pub fn entries_for(&self, process_instance: &ExecutionId) -> Vec<&OperationLogEntry> {
        self.entries
            .iter()
            .filter(|e| &e.process_instance == process_instance)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
