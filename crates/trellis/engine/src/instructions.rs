//! Applying modification instructions to a live execution tree
//!
//! Start variants add a child execution for the target activity (or
//! record that a recognized completion point was reached); the cancel
//! variant removes a branch, collapsing redundant ancestor scopes but
//! never past a scope whose collapse is suppressed. Whether the
//! instance as a whole ends up cancelled, completed, or still running
//! is decided exactly once, after the full instruction list has been
//! applied — if each instruction made that call itself, instruction
//! order would observably affect unrelated branches.

use crate::listeners::ListenerRegistry;
use crate::propagator::{self, CascadeOptions};
use trellis_types::{
    ActivityId, ChildSpec, ExecutionId, ExecutionTree, ModificationInstruction,
    ProcessDefinition, TargetFailure, Transition,
};

/// Everything an instruction needs besides the tree itself
pub struct ApplyContext<'a> {
    pub definition: &'a ProcessDefinition,
    pub listeners: &'a ListenerRegistry,
    pub skip_custom_listeners: bool,
    pub skip_io_mappings: bool,
}

/// Apply one instruction to the shared tree. Target resolution failures
/// abort the whole request; the caller wraps them with the instruction
/// index and describe() text.
pub fn apply(
    tree: &mut ExecutionTree,
    instruction: &ModificationInstruction,
    ctx: &ApplyContext<'_>,
) -> Result<(), TargetFailure> {
    match instruction {
        ModificationInstruction::CancelActivityInstance {
            activity,
            activity_instance,
        } => cancel(tree, ctx, activity, activity_instance.as_ref()),
        ModificationInstruction::StartBeforeActivity { activity } => {
            start_at(tree, ctx, activity)
        }
        ModificationInstruction::StartAfterActivity { activity } => {
            let transition = single_outgoing(ctx.definition, activity)?;
            let target = transition.target.clone();
            start_at(tree, ctx, &target)
        }
        ModificationInstruction::StartTransition { transition } => {
            let transition = ctx
                .definition
                .transition(transition)
                .ok_or_else(|| TargetFailure::TransitionNotFound(transition.clone()))?;
            let target = transition.target.clone();
            start_at(tree, ctx, &target)
        }
    }
}

fn cancel(
    tree: &mut ExecutionTree,
    ctx: &ApplyContext<'_>,
    activity: &ActivityId,
    activity_instance: Option<&ExecutionId>,
) -> Result<(), TargetFailure> {
    if ctx.definition.activity(activity).is_none() {
        return Err(TargetFailure::ActivityNotFound(activity.clone()));
    }

    let at_activity = tree.executions_at(activity);
    let target = match activity_instance {
        Some(id) => at_activity
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.id.clone())
            .ok_or_else(|| TargetFailure::InstanceNotAtActivity {
                execution: id.clone(),
                activity: activity.clone(),
            })?,
        None => match at_activity.len() {
            0 => return Err(TargetFailure::NoInstanceAtActivity(activity.clone())),
            1 => at_activity[0].id.clone(),
            count => {
                return Err(TargetFailure::AmbiguousActivityInstance {
                    activity: activity.clone(),
                    count,
                })
            }
        },
    };

    let options = CascadeOptions::new("Cancellation due to process instance modification")
        .skip_custom_listeners(ctx.skip_custom_listeners)
        .skip_io_mappings(ctx.skip_io_mappings);
    propagator::propagate_cancellation(tree, &target, &options, ctx.listeners);
    Ok(())
}

fn start_at(
    tree: &mut ExecutionTree,
    ctx: &ApplyContext<'_>,
    activity_id: &ActivityId,
) -> Result<(), TargetFailure> {
    let activity = ctx
        .definition
        .activity(activity_id)
        .ok_or_else(|| TargetFailure::ActivityNotFound(activity_id.clone()))?;

    let root = tree.root_id().clone();
    if activity.ends_process {
        // A recognized completion point: nothing to instantiate, the
        // instance carries the end indicator instead.
        tree.mark_ended(&root);
        return Ok(());
    }

    // A second branch under a scope turns an existing only child into
    // one of several concurrent siblings.
    let siblings = tree.non_event_scope_children(&root);
    let concurrent = !siblings.is_empty();
    if let [only] = siblings.as_slice() {
        if !only.concurrent {
            let only = only.id.clone();
            tree.set_concurrent(&only, true);
        }
    }

    let spec = ChildSpec {
        activity: Some(activity.id.clone()),
        scope: activity.scope,
        concurrent,
        event_scope: activity.event_scope,
    };
    // The root is a scope, so attaching the branch cannot be rejected.
    if let Ok(child) = tree.create_child(&root, spec) {
        if !ctx.skip_io_mappings {
            if let Some(execution) = tree.get(&child) {
                ctx.listeners.apply_input_mappings(execution);
            }
        }
    }
    Ok(())
}

fn single_outgoing<'d>(
    definition: &'d ProcessDefinition,
    activity: &ActivityId,
) -> Result<&'d Transition, TargetFailure> {
    if definition.activity(activity).is_none() {
        return Err(TargetFailure::ActivityNotFound(activity.clone()));
    }
    let outgoing = definition.outgoing(activity);
    match outgoing.as_slice() {
        [] => Err(TargetFailure::NoOutgoingTransition(activity.clone())),
        [only] => Ok(*only),
        many => Err(TargetFailure::AmbiguousOutgoingTransition {
            activity: activity.clone(),
            count: many.len(),
        }),
    }
}
