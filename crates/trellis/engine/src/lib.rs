//! Process-instance modification runtime for Trellis
//!
//! The engine mutates the live execution state of a running process
//! instance — starting or cancelling activity branches on demand — and
//! reconciles the resulting execution tree into a consistent terminal
//! or continuing state.
//!
//! # Control flow
//!
//! The [`ModificationOrchestrator`] loads the root execution, the
//! authorization gate approves the update, each instruction applies in
//! declared order, the tree is re-evaluated, and then either the
//! cancellation propagator or the regular completion path runs. One
//! audit entry is appended per request.
//!
//! One modification is one atomic unit of work on one logical thread.
//! Concurrency in the domain — parallel branches of a process
//! instance — is *data*, represented as sibling executions in the
//! tree, never as concurrent control flow in here. Exclusive access to
//! the instance for the duration of the operation is the business of
//! the enclosing command framework.
//!
//! # Example
//!
//! ```rust
//! use trellis_engine::{ModificationOrchestrator, ModificationOutcome};
//! use trellis_types::*;
//!
//! let mut orchestrator = ModificationOrchestrator::new();
//!
//! let mut definition = ProcessDefinition::new("two-branch");
//! definition.add_activity(Activity::task("x")).unwrap();
//! definition.add_activity(Activity::task("y")).unwrap();
//! let definition_id = definition.id.clone();
//! orchestrator.register_definition(definition);
//!
//! let mut tree = ExecutionTree::new(definition_id);
//! let root = tree.root_id().clone();
//! tree.create_child(&root, ChildSpec::at(ActivityId::new("x")).concurrent()).unwrap();
//! tree.create_child(&root, ChildSpec::at(ActivityId::new("y")).concurrent()).unwrap();
//! let instance_id = orchestrator.insert_instance(tree);
//!
//! let outcome = orchestrator
//!     .modify(ModificationRequest::new(instance_id).cancel_activity(ActivityId::new("x")))
//!     .unwrap();
//! assert_eq!(outcome, ModificationOutcome::Continuing);
//! ```

#![deny(unsafe_code)]

pub mod authorization;
pub mod execution_manager;
pub mod instructions;
pub mod listeners;
pub mod operation_log;
pub mod orchestrator;
pub mod propagator;
pub mod registry;

// Re-export main types
pub use authorization::{AuthorizationChecker, AuthorizationGate};
pub use execution_manager::ExecutionManager;
pub use instructions::ApplyContext;
pub use listeners::{CancellationListener, IoMappingHandler, ListenerRegistry};
pub use operation_log::{OperationLog, OperationLogEntry, OperationType, PropertyChange};
pub use orchestrator::{ModificationOrchestrator, ModificationOutcome};
pub use propagator::CascadeOptions;
pub use registry::DefinitionRegistry;
