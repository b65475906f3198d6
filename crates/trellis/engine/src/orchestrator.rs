//! Modification orchestrator: the entry point for mutating a live instance
//!
//! One modification runs as a single unit of work on one logical
//! thread: load the instance, pass the authorization gate, apply every
//! instruction in declared order, re-evaluate the tree, then either
//! cascade-cancel, finalize a regular completion, or leave the instance
//! running — and append exactly one audit entry.
//!
//! The orchestrator works on a private clone of the stored tree and
//! commits it only when the whole operation succeeded. A failing
//! instruction or checker therefore leaves the stored state untouched,
//! mirroring the rollback the enclosing command framework provides
//! around persistent state.

use crate::authorization::{AuthorizationChecker, AuthorizationGate};
use crate::execution_manager::ExecutionManager;
use crate::instructions::{self, ApplyContext};
use crate::listeners::{CancellationListener, IoMappingHandler, ListenerRegistry};
use crate::operation_log::{OperationLog, OperationType, PropertyChange};
use crate::propagator::{self, CascadeOptions};
use crate::registry::DefinitionRegistry;
use serde::{Deserialize, Serialize};
use trellis_types::{
    DefinitionId, EngineError, EngineResult, ExecutionId, ExecutionTree, ModificationRequest,
    ProcessDefinition,
};

const CANCELLATION_REASON: &str = "Cancellation due to process instance modification";

/// How a modified instance was left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModificationOutcome {
    /// Live branches remain; the instance keeps running
    Continuing,
    /// Execution fell off every branch without reaching a completion
    /// point; the instance was cascade-deleted
    Cancelled,
    /// A recognized completion point was reached; the instance ended
    /// regularly
    Completed,
}

/// Sequences instruction application against live process instances
#[derive(Default)]
pub struct ModificationOrchestrator {
    definitions: DefinitionRegistry,
    executions: ExecutionManager,
    gate: AuthorizationGate,
    listeners: ListenerRegistry,
    operation_log: OperationLog,
}

impl ModificationOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn with_checker(mut self, checker: Box<dyn AuthorizationChecker>) -> Self {
        self.gate.add_checker(checker);
        self
    }

    pub fn with_cancellation_listener(mut self, listener: Box<dyn CancellationListener>) -> Self {
        self.listeners.add_cancellation_listener(listener);
        self
    }

    pub fn with_io_mapping_handler(mut self, handler: Box<dyn IoMappingHandler>) -> Self {
        self.listeners.add_io_mapping_handler(handler);
        self
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a process definition
    pub fn register_definition(&mut self, definition: ProcessDefinition) -> DefinitionId {
        self.definitions.register(definition)
    }

    /// Hand a live instance tree to the runtime
    pub fn insert_instance(&mut self, tree: ExecutionTree) -> ExecutionId {
        self.executions.insert(tree)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn find_instance(&self, id: &ExecutionId) -> Option<&ExecutionTree> {
        self.executions.find_execution_by_id(id)
    }

    pub fn instance_count(&self) -> usize {
        self.executions.count()
    }

    pub fn operation_log(&self) -> &OperationLog {
        &self.operation_log
    }

    // ── Modification ─────────────────────────────────────────────────

    /// Apply one modification request. Either the whole request takes
    /// effect or none of it does.
    pub fn modify(&mut self, request: ModificationRequest) -> EngineResult<ModificationOutcome> {
        let instance_id = request.process_instance.clone();

        // Load the instance and pass the gate before touching anything.
        let stored = self.executions.require(&instance_id)?;
        self.gate.check_update(stored.root())?;

        let definition = self.definitions.get(stored.definition())?.clone();
        let mut tree = stored.clone();

        // Redundant-scope collapse must not climb into the root while
        // the instruction sequence is still in flight.
        tree.set_preserve_scope(&instance_id, true);

        {
            let ctx = ApplyContext {
                definition: &definition,
                listeners: &self.listeners,
                skip_custom_listeners: request.skip_custom_listeners,
                skip_io_mappings: request.skip_io_mappings,
            };
            for (index, instruction) in request.instructions.iter().enumerate() {
                tracing::debug!(
                    process_instance = %instance_id,
                    index,
                    instruction = %instruction.describe(),
                    "Applying modification instruction"
                );
                instructions::apply(&mut tree, instruction, &ctx).map_err(|source| {
                    EngineError::InstructionTarget {
                        index,
                        instruction: instruction.describe(),
                        source,
                    }
                })?;
            }
        }

        tree.set_preserve_scope(&instance_id, false);

        let outcome = self.resolve(tree, &request)?;

        if request.write_operation_log {
            self.operation_log.log_process_instance_operation(
                OperationType::ModifyProcessInstance,
                instance_id.clone(),
                vec![PropertyChange::empty()],
            );
        }

        tracing::info!(
            process_instance = %instance_id,
            outcome = ?outcome,
            "Process instance modification applied"
        );
        Ok(outcome)
    }

    /// Decide between cascade-cancel, regular completion, and business
    /// as usual, then commit the working tree (or tear it down).
    fn resolve(
        &mut self,
        mut tree: ExecutionTree,
        request: &ModificationRequest,
    ) -> EngineResult<ModificationOutcome> {
        let root = tree.root();
        if root.has_children() {
            self.executions.insert(tree);
            return Ok(ModificationOutcome::Continuing);
        }

        if root.ended {
            // Ended regularly: finalize without deleting anything.
            if !request.skip_io_mappings {
                self.listeners.apply_output_mappings(root);
            }
            self.executions.insert(tree);
            return Ok(ModificationOutcome::Completed);
        }

        if root.activity.is_none() {
            // Execution fell off every branch: the instance is gone.
            self.gate.check_delete(root)?;
            let instance_id = tree.root_id().clone();
            let options = CascadeOptions::new(CANCELLATION_REASON)
                .skip_custom_listeners(request.skip_custom_listeners)
                .skip_io_mappings(request.skip_io_mappings);
            propagator::propagate_cancellation(&mut tree, &instance_id, &options, &self.listeners);
            self.executions.remove(&instance_id);
            return Ok(ModificationOutcome::Cancelled);
        }

        // The root itself still sits at an activity.
        self.executions.insert(tree);
        Ok(ModificationOutcome::Continuing)
    }
}
