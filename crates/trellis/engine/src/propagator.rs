//! Cancellation propagation: how far a cascade may climb
//!
//! When a branch is removed, the question is which ancestor scopes go
//! with it. A scope whose only remaining non-event-scope child is the
//! branch being removed is itself redundant once that child is gone,
//! and removing it disturbs nobody, because there is no concurrent
//! sibling left under it. The walk therefore promotes the deletion
//! candidate upward and stops at the first ancestor that still carries
//! at least two non-event-scope children, or at a scope whose collapse
//! is suppressed for the running operation.

use crate::listeners::ListenerRegistry;
use trellis_types::{ExecutionId, ExecutionTree};

/// Options threaded through one cascade delete
#[derive(Clone, Debug)]
pub struct CascadeOptions {
    /// Recorded as the cancellation reason on listener callbacks
    pub reason: String,
    pub skip_custom_listeners: bool,
    pub skip_io_mappings: bool,
}

impl CascadeOptions {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            skip_custom_listeners: false,
            skip_io_mappings: false,
        }
    }

    pub fn skip_custom_listeners(mut self, skip: bool) -> Self {
        self.skip_custom_listeners = skip;
        self
    }

    pub fn skip_io_mappings(mut self, skip: bool) -> Self {
        self.skip_io_mappings = skip;
        self
    }
}

/// The highest ancestor that can be deleted together with `from`
/// without touching a live sibling branch.
///
/// Event scopes never count as concurrent work: they neither appear in
/// the sibling counts nor participate in the upward walk.
pub fn topmost_cancellable(tree: &ExecutionTree, from: &ExecutionId) -> ExecutionId {
    let mut candidate = from.clone();
    while let Some(parent) = tree.parent_scope_execution(&candidate, true) {
        if parent.preserve_scope {
            break;
        }
        if tree.non_event_scope_children(&parent.id).len() > 1 {
            break;
        }
        candidate = parent.id.clone();
    }
    candidate
}

/// Delete `top` and every descendant as one structural operation.
///
/// Cancellation listeners fire bottom-up (children before parents)
/// unless suppressed; io mappings are finalized for scope executions
/// unless suppressed. This is the only deletion primitive in the
/// runtime — there is no partial or soft delete.
pub fn delete_cascade(
    tree: &mut ExecutionTree,
    top: &ExecutionId,
    options: &CascadeOptions,
    listeners: &ListenerRegistry,
) {
    let removed = tree.remove_subtree(top);
    tracing::debug!(
        top = %top,
        removed = removed.len(),
        reason = %options.reason,
        "Cascade delete"
    );
    for execution in &removed {
        if !options.skip_custom_listeners {
            listeners.fire_cancel(execution, &options.reason);
        }
        if execution.scope && !options.skip_io_mappings {
            listeners.apply_output_mappings(execution);
        }
    }
}

/// Walk upward from `from` to the topmost cancellable execution and
/// cascade-delete that whole subtree. Returns the deleted top.
pub fn propagate_cancellation(
    tree: &mut ExecutionTree,
    from: &ExecutionId,
    options: &CascadeOptions,
    listeners: &ListenerRegistry,
) -> ExecutionId {
    let top = topmost_cancellable(tree, from);
    delete_cascade(tree, &top, options, listeners);
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::CancellationListener;
    use std::sync::{Arc, Mutex};
    use trellis_types::{ActivityId, ChildSpec, DefinitionId, Execution, ExecutionTree};

    fn make_tree() -> ExecutionTree {
        ExecutionTree::with_root_id(DefinitionId::new("def-1"), ExecutionId::new("instance-1"))
    }

    /// root -> scope -> [x, y] with both children concurrent
    fn make_two_branch_tree() -> (ExecutionTree, ExecutionId, ExecutionId, ExecutionId) {
        let mut tree = make_tree();
        let root = tree.root_id().clone();
        let scope = tree
            .create_child(&root, ChildSpec::at(ActivityId::new("sub")).scoped())
            .unwrap();
        let x = tree
            .create_child(&scope, ChildSpec::at(ActivityId::new("x")).concurrent())
            .unwrap();
        let y = tree
            .create_child(&scope, ChildSpec::at(ActivityId::new("y")).concurrent())
            .unwrap();
        (tree, scope, x, y)
    }

    #[test]
    fn test_walk_stops_at_scope_with_two_children() {
        let (tree, _scope, x, _y) = make_two_branch_tree();
        // Deleting x must not climb into the scope: y is still live.
        assert_eq!(topmost_cancellable(&tree, &x), x);
    }

    #[test]
    fn test_walk_climbs_through_single_child_scopes() {
        let mut tree = make_tree();
        let root = tree.root_id().clone();
        let outer = tree
            .create_child(&root, ChildSpec::at(ActivityId::new("outer")).scoped())
            .unwrap();
        let inner = tree
            .create_child(&outer, ChildSpec::at(ActivityId::new("inner")).scoped())
            .unwrap();
        let leaf = tree
            .create_child(&inner, ChildSpec::at(ActivityId::new("x")))
            .unwrap();

        // Each scope on the way up has exactly one child; the whole
        // chain is redundant, up to and including the root.
        assert_eq!(topmost_cancellable(&tree, &leaf), root);
    }

    #[test]
    fn test_walk_respects_preserve_scope() {
        let mut tree = make_tree();
        let root = tree.root_id().clone();
        let outer = tree
            .create_child(&root, ChildSpec::at(ActivityId::new("outer")).scoped())
            .unwrap();
        let leaf = tree
            .create_child(&outer, ChildSpec::at(ActivityId::new("x")))
            .unwrap();

        tree.set_preserve_scope(&root, true);
        // The walk may collapse outer but must stop below the root.
        assert_eq!(topmost_cancellable(&tree, &leaf), outer);
    }

    #[test]
    fn test_walk_ignores_event_scope_siblings() {
        let mut tree = make_tree();
        let root = tree.root_id().clone();
        let scope = tree
            .create_child(&root, ChildSpec::at(ActivityId::new("sub")).scoped())
            .unwrap();
        let leaf = tree
            .create_child(&scope, ChildSpec::at(ActivityId::new("x")))
            .unwrap();
        tree.create_child(&scope, ChildSpec::at(ActivityId::new("timer")).event_scope())
            .unwrap();

        // The timer boundary does not count as a live sibling.
        assert_eq!(topmost_cancellable(&tree, &leaf), root);
    }

    #[test]
    fn test_walk_from_root_is_trivial() {
        let tree = make_tree();
        let root = tree.root_id().clone();
        assert_eq!(topmost_cancellable(&tree, &root), root);
    }

    #[derive(Clone, Default)]
    struct Recorder {
        cancelled: Arc<Mutex<Vec<ExecutionId>>>,
    }

    impl CancellationListener for Recorder {
        fn on_cancel(&self, execution: &Execution, _reason: &str) {
            self.cancelled.lock().unwrap().push(execution.id.clone());
        }
    }

    #[test]
    fn test_cascade_fires_listeners_bottom_up() {
        let (mut tree, scope, x, y) = make_two_branch_tree();

        let recorder = Recorder::default();
        let mut listeners = ListenerRegistry::new();
        listeners.add_cancellation_listener(Box::new(recorder.clone()));

        let options = CascadeOptions::new("test cancellation");
        delete_cascade(&mut tree, &scope, &options, &listeners);

        let order = recorder.cancelled.lock().unwrap().clone();
        assert_eq!(order, vec![x, y, scope.clone()]);
        assert!(!tree.contains(&scope));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_cascade_skip_custom_listeners() {
        let (mut tree, scope, _x, _y) = make_two_branch_tree();

        let recorder = Recorder::default();
        let mut listeners = ListenerRegistry::new();
        listeners.add_cancellation_listener(Box::new(recorder.clone()));

        let options = CascadeOptions::new("test cancellation").skip_custom_listeners(true);
        delete_cascade(&mut tree, &scope, &options, &listeners);

        assert!(recorder.cancelled.lock().unwrap().is_empty());
        assert!(!tree.contains(&scope));
    }

    #[test]
    fn test_propagate_deletes_redundant_scope_but_spares_sibling() {
        let (mut tree, scope, x, y) = make_two_branch_tree();
        let listeners = ListenerRegistry::new();
        let options = CascadeOptions::new("test cancellation");

        // First branch: scope keeps the sibling.
        let top = propagate_cancellation(&mut tree, &x, &options, &listeners);
        assert_eq!(top, x);
        assert!(tree.contains(&scope));
        assert!(tree.contains(&y));

        // Second branch: the scope is now redundant and the walk climbs
        // to the root.
        let top = propagate_cancellation(&mut tree, &y, &options, &listeners);
        assert_eq!(top, tree.root_id().clone());
        assert!(tree.is_empty());
    }
}
