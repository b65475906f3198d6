//! Execution manager: lookup of live process-instance trees
//!
//! Trees are held fully materialized — every algorithm in this crate
//! needs whole-subtree visibility, so nothing is paged lazily.
//! Mutation happens through instruction application and cascade
//! deletion only; the manager itself just stores and finds.

use std::collections::HashMap;
use trellis_types::{EngineError, EngineResult, ExecutionId, ExecutionTree};

/// Live process instances, keyed by their root execution id
#[derive(Clone, Debug, Default)]
pub struct ExecutionManager {
    instances: HashMap<ExecutionId, ExecutionTree>,
}

impl ExecutionManager {
    /// Create a new empty manager
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Store an instance tree, replacing any previous state under the
    /// same root id. Returns the process-instance id.
    pub fn insert(&mut self, tree: ExecutionTree) -> ExecutionId {
        let id = tree.root_id().clone();
        self.instances.insert(id.clone(), tree);
        id
    }

    /// Look up a live process instance by id
    pub fn find_execution_by_id(&self, id: &ExecutionId) -> Option<&ExecutionTree> {
        self.instances.get(id)
    }

    /// Like [`find_execution_by_id`](Self::find_execution_by_id) but
    /// failing when the id does not resolve to a live instance
    pub fn require(&self, id: &ExecutionId) -> EngineResult<&ExecutionTree> {
        self.find_execution_by_id(id)
            .ok_or_else(|| EngineError::InstanceNotFound(id.clone()))
    }

    /// Drop an instance (after its root was cascade-deleted)
    pub fn remove(&mut self, id: &ExecutionId) -> Option<ExecutionTree> {
        self.instances.remove(id)
    }

    pub fn contains(&self, id: &ExecutionId) -> bool {
        self.instances.contains_key(id)
    }

    /// Number of live instances
    pub fn count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::DefinitionId;

    fn make_tree(id: &str) -> ExecutionTree {
        ExecutionTree::with_root_id(DefinitionId::new("def-1"), ExecutionId::new(id))
    }

    #[test]
    fn test_insert_and_find() {
        let mut manager = ExecutionManager::new();
        let id = manager.insert(make_tree("instance-1"));

        assert!(manager.contains(&id));
        assert_eq!(manager.count(), 1);
        assert!(manager.find_execution_by_id(&id).is_some());
    }

    #[test]
    fn test_find_is_idempotent() {
        let mut manager = ExecutionManager::new();
        let id = manager.insert(make_tree("instance-1"));

        let first = manager.find_execution_by_id(&id).cloned();
        let second = manager.find_execution_by_id(&id).cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_require_missing() {
        let manager = ExecutionManager::new();
        let result = manager.require(&ExecutionId::new("ghost"));
        assert!(matches!(result, Err(EngineError::InstanceNotFound(_))));
    }

    #[test]
    fn test_remove() {
        let mut manager = ExecutionManager::new();
        let id = manager.insert(make_tree("instance-1"));

        assert!(manager.remove(&id).is_some());
        assert!(!manager.contains(&id));
        assert!(manager.remove(&id).is_none());
    }
}
