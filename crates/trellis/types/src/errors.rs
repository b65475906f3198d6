//! Error taxonomy for the process runtime
//!
//! Three failure classes, all fatal to the operation that raised them:
//! the target instance is absent, an authorization checker denied the
//! action, or an instruction named a target that does not resolve.
//! Nothing is retried internally and nothing is swallowed — every error
//! carries enough context (instance id, instruction index and text) to
//! diagnose without inspecting runtime state.

use crate::{ActivityId, DefinitionId, ExecutionId, TransitionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used across the runtime crates
pub type EngineResult<T> = Result<T, EngineError>;

/// Actions guarded by the authorization gate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectedAction {
    /// Mutating a live process instance
    UpdateProcessInstance,
    /// Destructively cancelling a whole process instance
    DeleteProcessInstance,
}

impl std::fmt::Display for ProtectedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpdateProcessInstance => write!(f, "update process instance"),
            Self::DeleteProcessInstance => write!(f, "delete process instance"),
        }
    }
}

/// Why an instruction target failed to resolve at apply time
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TargetFailure {
    #[error("activity '{0}' does not exist in the process definition")]
    ActivityNotFound(ActivityId),

    #[error("transition '{0}' does not exist in the process definition")]
    TransitionNotFound(TransitionId),

    #[error("no activity instance is active at activity '{0}'")]
    NoInstanceAtActivity(ActivityId),

    #[error("{count} activity instances are active at activity '{activity}'; an explicit instance id is required")]
    AmbiguousActivityInstance { activity: ActivityId, count: usize },

    #[error("execution '{execution}' is not at activity '{activity}'")]
    InstanceNotAtActivity {
        execution: ExecutionId,
        activity: ActivityId,
    },

    #[error("activity '{0}' has no outgoing transition")]
    NoOutgoingTransition(ActivityId),

    #[error("activity '{activity}' has {count} outgoing transitions; name the transition explicitly")]
    AmbiguousOutgoingTransition { activity: ActivityId, count: usize },
}

/// Errors raised by the modification runtime
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("process instance not found: {0}")]
    InstanceNotFound(ExecutionId),

    #[error("process definition not found: {0}")]
    DefinitionNotFound(DefinitionId),

    #[error("{action} denied on process instance {process_instance} by checker '{denied_by}'")]
    AuthorizationDenied {
        action: ProtectedAction,
        process_instance: ExecutionId,
        denied_by: String,
    },

    #[error("instruction {index} [{instruction}] failed: {source}")]
    InstructionTarget {
        index: usize,
        instruction: String,
        #[source]
        source: TargetFailure,
    },

    #[error("duplicate activity id: {0}")]
    DuplicateActivity(ActivityId),

    #[error("duplicate transition id: {0}")]
    DuplicateTransition(TransitionId),

    #[error("transition '{transition}' references unknown activity '{activity}'")]
    UnknownTransitionEndpoint {
        transition: TransitionId,
        activity: ActivityId,
    },

    #[error("invalid execution tree: {0}")]
    InvalidTree(String),
}
