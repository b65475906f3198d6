//! Definition registry: lookup of deployed process definitions
//!
//! Deployment and parsing happen outside the runtime; definitions
//! arrive here fully built and are immutable once registered.

use std::collections::HashMap;
use trellis_types::{DefinitionId, EngineError, EngineResult, ProcessDefinition};

/// Registry of process definitions
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<DefinitionId, ProcessDefinition>,
}

impl DefinitionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Register a process definition. Returns the definition id.
    pub fn register(&mut self, definition: ProcessDefinition) -> DefinitionId {
        let id = definition.id.clone();
        tracing::info!(definition_id = %id, key = %definition.key, "Process definition registered");
        self.definitions.insert(id.clone(), definition);
        id
    }

    /// Get a definition by id
    pub fn get(&self, id: &DefinitionId) -> EngineResult<&ProcessDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| EngineError::DefinitionNotFound(id.clone()))
    }

    /// Check if a definition exists
    pub fn contains(&self, id: &DefinitionId) -> bool {
        self.definitions.contains_key(id)
    }

    /// Total number of registered definitions
    pub fn count(&self) -> usize {
        self.definitions.len()
    }
}
