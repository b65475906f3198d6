//! Modification instructions: ordered units of change against a live instance
//!
//! The four kinds form a closed variant set — cancel an activity
//! instance, start a branch before or after an activity, or start along
//! a transition. Instructions are immutable once built and applied
//! exactly once, in declared order. The request-level skip flags apply
//! uniformly to every instruction it carries.

use crate::{ActivityId, ExecutionId, TransitionId};
use serde::{Deserialize, Serialize};

// ── Instruction ──────────────────────────────────────────────────────

/// One unit of change to a process instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModificationInstruction {
    /// Cancel the branch rooted at an activity instance. When several
    /// instances are active at the activity, `activity_instance` picks
    /// the concrete one; leaving it unset is an error in that case.
    CancelActivityInstance {
        activity: ActivityId,
        activity_instance: Option<ExecutionId>,
    },
    /// Start a new branch entering the given activity
    StartBeforeActivity { activity: ActivityId },
    /// Start a new branch on the single transition leaving the activity
    StartAfterActivity { activity: ActivityId },
    /// Start a new branch along an explicit transition
    StartTransition { transition: TransitionId },
}

impl ModificationInstruction {
    pub fn cancel(activity: ActivityId) -> Self {
        Self::CancelActivityInstance {
            activity,
            activity_instance: None,
        }
    }

    pub fn cancel_instance(activity: ActivityId, activity_instance: ExecutionId) -> Self {
        Self::CancelActivityInstance {
            activity,
            activity_instance: Some(activity_instance),
        }
    }

    pub fn start_before(activity: ActivityId) -> Self {
        Self::StartBeforeActivity { activity }
    }

    pub fn start_after(activity: ActivityId) -> Self {
        Self::StartAfterActivity { activity }
    }

    pub fn start_transition(transition: TransitionId) -> Self {
        Self::StartTransition { transition }
    }

    /// Human-readable text for audit entries and error context
    pub fn describe(&self) -> String {
        match self {
            Self::CancelActivityInstance {
                activity,
                activity_instance: Some(instance),
            } => format!("Cancel activity instance '{instance}' at activity '{activity}'"),
            Self::CancelActivityInstance { activity, .. } => {
                format!("Cancel activity instance at activity '{activity}'")
            }
            Self::StartBeforeActivity { activity } => {
                format!("Start before activity '{activity}'")
            }
            Self::StartAfterActivity { activity } => {
                format!("Start after activity '{activity}'")
            }
            Self::StartTransition { transition } => {
                format!("Start transition '{transition}'")
            }
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────

/// A complete modification of one process instance: an ordered
/// instruction list plus the flags shared by all of them. Built once,
/// consumed by the orchestrator, then discarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModificationRequest {
    /// Root execution id of the instance to modify
    pub process_instance: ExecutionId,
    /// Instructions, applied strictly in this order
    pub instructions: Vec<ModificationInstruction>,
    /// Suppress custom cancellation listeners for the whole request
    pub skip_custom_listeners: bool,
    /// Suppress io-mapping finalization for the whole request
    pub skip_io_mappings: bool,
    /// Append an operation-log entry on success
    pub write_operation_log: bool,
}

impl ModificationRequest {
    pub fn new(process_instance: ExecutionId) -> Self {
        Self {
            process_instance,
            instructions: Vec::new(),
            skip_custom_listeners: false,
            skip_io_mappings: false,
            write_operation_log: true,
        }
    }

    pub fn cancel_activity(self, activity: ActivityId) -> Self {
        self.instruction(ModificationInstruction::cancel(activity))
    }

    pub fn cancel_activity_instance(
        self,
        activity: ActivityId,
        activity_instance: ExecutionId,
    ) -> Self {
        self.instruction(ModificationInstruction::cancel_instance(
            activity,
            activity_instance,
        ))
    }

    pub fn start_before_activity(self, activity: ActivityId) -> Self {
        self.instruction(ModificationInstruction::start_before(activity))
    }

    pub fn start_after_activity(self, activity: ActivityId) -> Self {
        self.instruction(ModificationInstruction::start_after(activity))
    }

    pub fn start_transition(self, transition: TransitionId) -> Self {
        self.instruction(ModificationInstruction::start_transition(transition))
    }

    pub fn instruction(mut self, instruction: ModificationInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn skip_custom_listeners(mut self, skip: bool) -> Self {
        self.skip_custom_listeners = skip;
        self
    }

    pub fn skip_io_mappings(mut self, skip: bool) -> Self {
        self.skip_io_mappings = skip;
        self
    }

    pub fn write_operation_log(mut self, write: bool) -> Self {
        self.write_operation_log = write;
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_in_order() {
        let request = ModificationRequest::new(ExecutionId::new("instance-1"))
            .cancel_activity(ActivityId::new("x"))
            .start_before_activity(ActivityId::new("y"))
            .start_transition(TransitionId::new("flow-1"));

        assert_eq!(request.len(), 3);
        assert!(matches!(
            request.instructions[0],
            ModificationInstruction::CancelActivityInstance { .. }
        ));
        assert!(matches!(
            request.instructions[2],
            ModificationInstruction::StartTransition { .. }
        ));
        // Defaults: log the operation, skip nothing.
        assert!(request.write_operation_log);
        assert!(!request.skip_custom_listeners);
        assert!(!request.skip_io_mappings);
    }

    #[test]
    fn test_flags() {
        let request = ModificationRequest::new(ExecutionId::new("instance-1"))
            .skip_custom_listeners(true)
            .skip_io_mappings(true)
            .write_operation_log(false);

        assert!(request.skip_custom_listeners);
        assert!(request.skip_io_mappings);
        assert!(!request.write_operation_log);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            ModificationInstruction::cancel(ActivityId::new("review")).describe(),
            "Cancel activity instance at activity 'review'"
        );
        assert_eq!(
            ModificationInstruction::cancel_instance(
                ActivityId::new("review"),
                ExecutionId::new("exec-7")
            )
            .describe(),
            "Cancel activity instance 'exec-7' at activity 'review'"
        );
        assert_eq!(
            ModificationInstruction::start_after(ActivityId::new("pick")).describe(),
            "Start after activity 'pick'"
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let request = ModificationRequest::new(ExecutionId::new("instance-1"))
            .cancel_activity(ActivityId::new("x"))
            .skip_io_mappings(true);
        let json = serde_json::to_string(&request).unwrap();
        let back: ModificationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
