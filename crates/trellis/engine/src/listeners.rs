//! Listener hooks fired while the tree is mutated
//!
//! Custom cancellation listeners observe each execution leaving the
//! tree, bottom-up. Io-mapping handlers finalize variable mappings when
//! scope executions are created or torn down. Either set can be
//! suppressed per request through the skip flags.

use trellis_types::Execution;

/// Observes executions removed by a cascade delete. "Custom" in the
/// sense of the `skip_custom_listeners` request flag.
pub trait CancellationListener: Send + Sync {
    fn on_cancel(&self, execution: &Execution, reason: &str);
}

/// Applies io mappings when executions enter or leave scopes
pub trait IoMappingHandler: Send + Sync {
    fn apply_input_mappings(&self, _execution: &Execution) {}

    fn apply_output_mappings(&self, _execution: &Execution) {}
}

/// The listeners configured on an orchestrator
#[derive(Default)]
pub struct ListenerRegistry {
    cancellation: Vec<Box<dyn CancellationListener>>,
    io_mappings: Vec<Box<dyn IoMappingHandler>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cancellation_listener(&mut self, listener: Box<dyn CancellationListener>) {
        self.cancellation.push(listener);
    }

    pub fn add_io_mapping_handler(&mut self, handler: Box<dyn IoMappingHandler>) {
        self.io_mappings.push(handler);
    }

    pub fn fire_cancel(&self, execution: &Execution, reason: &str) {
        for listener in &self.cancellation {
            listener.on_cancel(execution, reason);
        }
    }

    pub fn apply_input_mappings(&self, execution: &Execution) {
        for handler in &self.io_mappings {
            handler.apply_input_mappings(execution);
        }
    }

    pub fn apply_output_mappings(&self, execution: &Execution) {
        for handler in &self.io_mappings {
            handler.apply_output_mappings(execution);
        }
    }
}
