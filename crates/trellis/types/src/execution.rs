//! Execution trees: the runtime state of a process instance
//!
//! An [`Execution`] is one thread of control inside a process instance.
//! Executions form a tree: the root represents the instance itself,
//! scope executions own variables and listeners for their subtree, and
//! concurrent executions are parallel siblings under a shared scope.
//!
//! The tree is an arena of records indexed by id. Parent/child links are
//! stored as id references rather than owning pointers, so the
//! parent-child back-references stay acyclic in ownership terms.
//!
//! Mutation goes through the named operations below — instruction
//! application and cascade deletion in the engine crate build on them.
//! Callers never assign fields of a stored execution directly.

use crate::{ActivityId, DefinitionId, EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Identifier ───────────────────────────────────────────────────────

/// Unique identifier for an execution. The root execution's id doubles
/// as the process-instance id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Execution ────────────────────────────────────────────────────────

/// One thread of control within a process instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique id
    pub id: ExecutionId,
    /// Parent execution; absent for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ExecutionId>,
    /// Child executions, in creation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExecutionId>,
    /// The activity this execution currently sits at, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityId>,
    /// Owns variable/listener scope for itself and its descendants
    pub scope: bool,
    /// One of several parallel siblings under a shared scope
    pub concurrent: bool,
    /// Represents a boundary-event scope rather than real concurrent work
    pub event_scope: bool,
    /// Reached a recognized completion point
    pub ended: bool,
    /// Suppresses automatic collapse of this scope while set
    pub preserve_scope: bool,
}

impl Execution {
    fn root(id: ExecutionId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            activity: None,
            scope: true,
            concurrent: false,
            event_scope: false,
            ended: false,
            preserve_scope: false,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ── Child specification ──────────────────────────────────────────────

/// Attributes for a child execution about to be created
#[derive(Clone, Debug, Default)]
pub struct ChildSpec {
    pub activity: Option<ActivityId>,
    pub scope: bool,
    pub concurrent: bool,
    pub event_scope: bool,
}

impl ChildSpec {
    /// A child sitting at the given activity
    pub fn at(activity: ActivityId) -> Self {
        Self {
            activity: Some(activity),
            ..Self::default()
        }
    }

    pub fn scoped(mut self) -> Self {
        self.scope = true;
        self
    }

    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }

    pub fn event_scope(mut self) -> Self {
        self.scope = true;
        self.event_scope = true;
        self
    }
}

// ── Execution Tree ───────────────────────────────────────────────────

/// The hierarchical execution state of one process instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTree {
    /// The definition this instance runs
    definition: DefinitionId,
    /// Root execution id — also the process-instance id
    root: ExecutionId,
    /// All live executions, indexed by id
    executions: HashMap<ExecutionId, Execution>,
}

impl ExecutionTree {
    /// Create a tree holding only the root execution (a scope)
    pub fn new(definition: DefinitionId) -> Self {
        Self::with_root_id(definition, ExecutionId::generate())
    }

    /// Create a tree with a caller-chosen root id
    pub fn with_root_id(definition: DefinitionId, root: ExecutionId) -> Self {
        let mut executions = HashMap::new();
        executions.insert(root.clone(), Execution::root(root.clone()));
        Self {
            definition,
            root,
            executions,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn definition(&self) -> &DefinitionId {
        &self.definition
    }

    pub fn root_id(&self) -> &ExecutionId {
        &self.root
    }

    /// The root execution. Panics only if the root was cascade-deleted,
    /// after which the tree is discarded by its owner.
    pub fn root(&self) -> &Execution {
        &self.executions[&self.root]
    }

    pub fn get(&self, id: &ExecutionId) -> Option<&Execution> {
        self.executions.get(id)
    }

    pub fn contains(&self, id: &ExecutionId) -> bool {
        self.executions.contains_key(id)
    }

    pub fn has_children(&self, id: &ExecutionId) -> bool {
        self.get(id).map(Execution::has_children).unwrap_or(false)
    }

    pub fn children(&self, id: &ExecutionId) -> Vec<&Execution> {
        self.get(id)
            .map(|e| {
                e.children
                    .iter()
                    .filter_map(|c| self.executions.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Children that represent real concurrent work — event scopes are
    /// excluded from every sibling count the cancellation walk takes.
    pub fn non_event_scope_children(&self, id: &ExecutionId) -> Vec<&Execution> {
        self.children(id)
            .into_iter()
            .filter(|c| !c.event_scope)
            .collect()
    }

    /// Nearest ancestor (possibly several links up) that is itself a
    /// scope. With `skip_event_scopes`, boundary-event scopes are passed
    /// over. Used by the cancellation algorithm, not by generic
    /// navigation.
    pub fn parent_scope_execution(
        &self,
        id: &ExecutionId,
        skip_event_scopes: bool,
    ) -> Option<&Execution> {
        let mut current = self.get(id)?.parent.as_ref();
        while let Some(parent_id) = current {
            let parent = self.get(parent_id)?;
            if parent.scope && !(skip_event_scopes && parent.event_scope) {
                return Some(parent);
            }
            current = parent.parent.as_ref();
        }
        None
    }

    /// All executions currently sitting at the given activity
    pub fn executions_at(&self, activity: &ActivityId) -> Vec<&Execution> {
        let mut found: Vec<&Execution> = self
            .executions
            .values()
            .filter(|e| e.activity.as_ref() == Some(activity))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// Number of live executions
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a child execution under `parent`
    pub fn create_child(
        &mut self,
        parent: &ExecutionId,
        spec: ChildSpec,
    ) -> EngineResult<ExecutionId> {
        let parent_scope = self
            .get(parent)
            .ok_or_else(|| {
                EngineError::InvalidTree(format!("parent execution '{parent}' does not exist"))
            })?
            .scope;
        if spec.concurrent && !parent_scope {
            return Err(EngineError::InvalidTree(format!(
                "concurrent execution requires a scope parent, '{parent}' is not a scope"
            )));
        }

        let id = ExecutionId::generate();
        let child = Execution {
            id: id.clone(),
            parent: Some(parent.clone()),
            children: Vec::new(),
            activity: spec.activity,
            scope: spec.scope,
            concurrent: spec.concurrent,
            event_scope: spec.event_scope,
            ended: false,
            preserve_scope: false,
        };
        self.executions.insert(id.clone(), child);
        if let Some(parent) = self.executions.get_mut(parent) {
            parent.children.push(id.clone());
        }
        Ok(id)
    }

    /// Move an execution to a different activity (or off any activity)
    pub fn set_activity(&mut self, id: &ExecutionId, activity: Option<ActivityId>) {
        if let Some(execution) = self.executions.get_mut(id) {
            execution.activity = activity;
        }
    }

    /// Flag an execution as having reached a completion point
    pub fn mark_ended(&mut self, id: &ExecutionId) {
        if let Some(execution) = self.executions.get_mut(id) {
            execution.ended = true;
        }
    }

    /// Toggle collapse suppression on a scope execution
    pub fn set_preserve_scope(&mut self, id: &ExecutionId, preserve: bool) {
        if let Some(execution) = self.executions.get_mut(id) {
            execution.preserve_scope = preserve;
        }
    }

    /// Mark an execution as one of several parallel siblings
    pub fn set_concurrent(&mut self, id: &ExecutionId, concurrent: bool) {
        if let Some(execution) = self.executions.get_mut(id) {
            execution.concurrent = concurrent;
        }
    }

    /// Remove an execution and every descendant, detaching from the
    /// parent. Returns the removed executions bottom-up (children before
    /// parents), the order cancellation listeners fire in. This is the
    /// only structural delete on the tree.
    pub fn remove_subtree(&mut self, id: &ExecutionId) -> Vec<Execution> {
        let Some(target) = self.executions.get(id) else {
            return Vec::new();
        };

        if let Some(parent_id) = target.parent.clone() {
            if let Some(parent) = self.executions.get_mut(&parent_id) {
                parent.children.retain(|c| c != id);
            }
        }

        let mut removed = Vec::new();
        self.collect_bottom_up(id, &mut removed);
        removed
    }

    fn collect_bottom_up(&mut self, id: &ExecutionId, removed: &mut Vec<Execution>) {
        let children = self
            .executions
            .get(id)
            .map(|e| e.children.clone())
            .unwrap_or_default();
        for child in children {
            self.collect_bottom_up(&child, removed);
        }
        if let Some(execution) = self.executions.remove(id) {
            removed.push(execution);
        }
    }

    // ── Consistency ──────────────────────────────────────────────────

    /// Check the structural invariants: a single root, consistent
    /// parent/child back-references, and concurrent executions only
    /// under scope parents.
    pub fn validate(&self) -> EngineResult<()> {
        let mut roots = 0;
        for execution in self.executions.values() {
            match &execution.parent {
                None => {
                    roots += 1;
                    if execution.id != self.root {
                        return Err(EngineError::InvalidTree(format!(
                            "execution '{}' has no parent but is not the root",
                            execution.id
                        )));
                    }
                }
                Some(parent_id) => {
                    let parent = self.get(parent_id).ok_or_else(|| {
                        EngineError::InvalidTree(format!(
                            "execution '{}' references missing parent '{parent_id}'",
                            execution.id
                        ))
                    })?;
                    if !parent.children.contains(&execution.id) {
                        return Err(EngineError::InvalidTree(format!(
                            "parent '{parent_id}' does not list child '{}'",
                            execution.id
                        )));
                    }
                    if execution.concurrent && !parent.scope {
                        return Err(EngineError::InvalidTree(format!(
                            "concurrent execution '{}' sits under non-scope parent '{parent_id}'",
                            execution.id
                        )));
                    }
                }
            }
        }
        if roots != 1 {
            return Err(EngineError::InvalidTree(format!(
                "expected exactly one root execution, found {roots}"
            )));
        }
        Ok(())
    }
}
