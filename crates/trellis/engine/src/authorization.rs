//! Authorization gate: pluggable checkers consulted before mutation
//!
//! Checkers are an unordered set of independent capabilities supplied
//! by the surrounding engine configuration. Every checker must grant an
//! action; the first denial aborts the whole operation. The update
//! check runs before any instruction is applied, the delete check runs
//! again before a destructive cascade actually executes.

use trellis_types::{EngineError, EngineResult, Execution, ProtectedAction};

/// One authorization capability. Both checks grant by default so an
/// implementation can guard a single action.
pub trait AuthorizationChecker: Send + Sync {
    /// Stable name surfaced in denial errors
    fn name(&self) -> &str;

    /// May this caller mutate the process instance?
    fn check_update_process_instance(&self, _execution: &Execution) -> bool {
        true
    }

    /// May this caller destroy the process instance?
    fn check_delete_process_instance(&self, _execution: &Execution) -> bool {
        true
    }
}

/// The set of registered checkers
#[derive(Default)]
pub struct AuthorizationGate {
    checkers: Vec<Box<dyn AuthorizationChecker>>,
}

impl AuthorizationGate {
    pub fn new() -> Self {
        Self {
            checkers: Vec::new(),
        }
    }

    pub fn add_checker(&mut self, checker: Box<dyn AuthorizationChecker>) {
        self.checkers.push(checker);
    }

    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }

    /// Run every checker's update check against the instance root
    pub fn check_update(&self, execution: &Execution) -> EngineResult<()> {
        self.check(execution, ProtectedAction::UpdateProcessInstance)
    }

    /// Run every checker's delete check against the instance root
    pub fn check_delete(&self, execution: &Execution) -> EngineResult<()> {
        self.check(execution, ProtectedAction::DeleteProcessInstance)
    }

    fn check(&self, execution: &Execution, action: ProtectedAction) -> EngineResult<()> {
        for checker in &self.checkers {
            let granted = match action {
                ProtectedAction::UpdateProcessInstance => {
                    checker.check_update_process_instance(execution)
                }
                ProtectedAction::DeleteProcessInstance => {
                    checker.check_delete_process_instance(execution)
                }
            };
            if !granted {
                tracing::debug!(
                    process_instance = %execution.id,
                    checker = checker.name(),
                    %action,
                    "Authorization denied"
                );
                return Err(EngineError::AuthorizationDenied {
                    action,
                    process_instance: execution.id.clone(),
                    denied_by: checker.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
