//! Historic process instances: the record a finished instance leaves
//!
//! Historic records outlive the runtime tree. They snapshot the
//! definition attributes that retention depends on — key, version and
//! time-to-live — at start time, so cleanup never has to resolve a
//! definition again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use trellis_types::{DefinitionId, ExecutionId, ProcessDefinition};

/// Terminal (or still-running) state of a historic instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoricInstanceState {
    Active,
    Completed,
    Cancelled,
}

/// The historic record of one process instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricProcessInstance {
    pub id: ExecutionId,
    pub definition: DefinitionId,
    pub definition_key: String,
    pub definition_name: String,
    pub definition_version: u32,
    /// Retention in days after the end time; `None` keeps the record
    /// forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_time_to_live: Option<u32>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub state: HistoricInstanceState,
}

impl HistoricProcessInstance {
    /// Open a historic record for a freshly started instance
    pub fn started(
        definition: &ProcessDefinition,
        id: ExecutionId,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            definition: definition.id.clone(),
            definition_key: definition.key.clone(),
            definition_name: definition.name.clone(),
            definition_version: definition.version,
            history_time_to_live: definition.history_time_to_live,
            start_time,
            end_time: None,
            state: HistoricInstanceState::Active,
        }
    }

    /// Close the record
    pub fn finish(&mut self, state: HistoricInstanceState, end_time: DateTime<Utc>) {
        self.state = state;
        self.end_time = Some(end_time);
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Is this record eligible for cleanup at `now`? Only finished
    /// instances with a time-to-live qualify: a zero TTL makes them
    /// eligible the moment they end, an absent TTL never.
    pub fn cleanable_at(&self, now: DateTime<Utc>) -> bool {
        match (self.end_time, self.history_time_to_live) {
            (Some(end_time), Some(ttl)) => end_time + Duration::days(i64::from(ttl)) <= now,
            _ => false,
        }
    }
}
