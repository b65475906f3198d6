//! Walkthrough: modify a two-branch process instance until it is gone.
//!
//! Builds a parallel-review definition, hands a live instance tree to
//! the orchestrator, cancels one branch (the instance keeps running),
//! then cancels the rest (the instance is cascade-deleted), and closes
//! the historic record. Prints the operation log and the
//! finished-instance report at the end.

use chrono::Utc;
use trellis_engine::{ModificationOrchestrator, ModificationOutcome};
use trellis_history::{HistoricInstanceState, HistoryStore};
use trellis_types::{
    Activity, ActivityId, ChildSpec, ExecutionTree, ModificationRequest, ProcessDefinition,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut definition = ProcessDefinition::new("parallel-review")
        .with_name("Parallel Review")
        .with_history_time_to_live(Some(5));
    definition.add_activity(Activity::subprocess("review"))?;
    definition.add_activity(Activity::task("check-figures"))?;
    definition.add_activity(Activity::task("check-wording"))?;
    definition.add_activity(Activity::end_event("done"))?;

    let mut orchestrator = ModificationOrchestrator::new();
    let definition_id = definition.id.clone();
    orchestrator.register_definition(definition.clone());

    // root -> review scope -> two concurrent branches
    let mut tree = ExecutionTree::new(definition_id);
    let root = tree.root_id().clone();
    let review = tree.create_child(&root, ChildSpec::at(ActivityId::new("review")).scoped())?;
    tree.create_child(
        &review,
        ChildSpec::at(ActivityId::new("check-figures")).concurrent(),
    )?;
    tree.create_child(
        &review,
        ChildSpec::at(ActivityId::new("check-wording")).concurrent(),
    )?;
    let instance_id = orchestrator.insert_instance(tree);

    let mut history = HistoryStore::new();
    history.record_started(&definition, instance_id.clone(), Utc::now());

    // Cancel one branch: the sibling keeps the instance alive.
    let outcome = orchestrator.modify(
        ModificationRequest::new(instance_id.clone())
            .cancel_activity(ActivityId::new("check-figures")),
    )?;
    println!("after first modification:  {outcome:?}");

    // Cancel the rest: the shared scope becomes redundant and the
    // cascade takes the whole instance with it.
    let outcome = orchestrator.modify(
        ModificationRequest::new(instance_id.clone())
            .cancel_activity(ActivityId::new("check-wording")),
    )?;
    println!("after second modification: {outcome:?}");

    let state = match outcome {
        ModificationOutcome::Completed => HistoricInstanceState::Completed,
        _ => HistoricInstanceState::Cancelled,
    };
    history.record_finished(&instance_id, state, Utc::now())?;

    println!("\noperation log:");
    for entry in orchestrator.operation_log().entries() {
        println!(
            "  {} {} on {}",
            entry.timestamp, entry.operation, entry.process_instance
        );
    }

    println!("\nfinished-instance report:");
    for row in history.finished_instance_report(Utc::now()) {
        println!(
            "  {} v{}: finished={} cleanable={} ttl={:?}",
            row.definition_key,
            row.definition_version,
            row.finished_count,
            row.cleanable_count,
            row.history_time_to_live
        );
    }

    Ok(())
}
