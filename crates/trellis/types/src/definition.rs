//! Process definitions: the static structure instructions resolve against
//!
//! Deployment and parsing live outside the runtime. The engine only needs
//! activities and transitions that are resolvable by id, plus the handful
//! of per-activity attributes the modification algorithms read: whether an
//! activity owns a scope, whether it is an event scope, and whether it is
//! a recognized completion point of the process.

use crate::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a process definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub String);

impl DefinitionId {
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

impl std::fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an activity within a definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transition within a definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub String);

impl TransitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Activity ─────────────────────────────────────────────────────────

/// An activity in a process definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique id within the definition
    pub id: ActivityId,
    /// Human-readable name
    pub name: String,
    /// Does an execution at this activity own variable/listener scope
    pub scope: bool,
    /// Event scopes (timer/error boundaries) never count as concurrent work
    pub event_scope: bool,
    /// Reaching this activity is a recognized completion point
    pub ends_process: bool,
}

impl Activity {
    /// A plain task activity
    pub fn task(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: ActivityId::new(id),
            scope: false,
            event_scope: false,
            ends_process: false,
        }
    }

    /// A scope-owning activity (embedded subprocess)
    pub fn subprocess(id: impl Into<String>) -> Self {
        Self {
            scope: true,
            ..Self::task(id)
        }
    }

    /// An event scope (boundary event attachment)
    pub fn event_scope(id: impl Into<String>) -> Self {
        Self {
            scope: true,
            event_scope: true,
            ..Self::task(id)
        }
    }

    /// A process end event
    pub fn end_event(id: impl Into<String>) -> Self {
        Self {
            ends_process: true,
            ..Self::task(id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ── Transition ───────────────────────────────────────────────────────

/// A directed transition between two activities
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    pub source: ActivityId,
    pub target: ActivityId,
}

impl Transition {
    pub fn new(id: impl Into<String>, source: ActivityId, target: ActivityId) -> Self {
        Self {
            id: TransitionId::new(id),
            source,
            target,
        }
    }
}

// ── Process Definition ───────────────────────────────────────────────

/// A process definition — the static blueprint a process instance runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Unique identifier
    pub id: DefinitionId,
    /// Stable key shared by all versions of this definition
    pub key: String,
    /// Human-readable name
    pub name: String,
    /// Version for tracking definition evolution
    pub version: u32,
    /// Activities, resolvable by id
    pub activities: Vec<Activity>,
    /// Transitions, resolvable by id
    pub transitions: Vec<Transition>,
    /// Retention in days for finished instances. `None` means finished
    /// instances are never eligible for historic cleanup; zero means
    /// they are eligible as soon as they end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_time_to_live: Option<u32>,
    /// When this definition was deployed
    pub deployed_at: DateTime<Utc>,
}

impl ProcessDefinition {
    /// Create a new process definition
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            id: DefinitionId::generate(),
            name: key.clone(),
            key,
            version: 1,
            activities: Vec::new(),
            transitions: Vec::new(),
            history_time_to_live: None,
            deployed_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_history_time_to_live(mut self, days: Option<u32>) -> Self {
        self.history_time_to_live = days;
        self
    }

    /// Add an activity. Fails on a duplicate id.
    pub fn add_activity(&mut self, activity: Activity) -> EngineResult<()> {
        if self.activity(&activity.id).is_some() {
            return Err(EngineError::DuplicateActivity(activity.id));
        }
        self.activities.push(activity);
        Ok(())
    }

    /// Add a transition. Both endpoints must already be registered.
    pub fn add_transition(&mut self, transition: Transition) -> EngineResult<()> {
        if self.transition(&transition.id).is_some() {
            return Err(EngineError::DuplicateTransition(transition.id));
        }
        for endpoint in [&transition.source, &transition.target] {
            if self.activity(endpoint).is_none() {
                return Err(EngineError::UnknownTransitionEndpoint {
                    transition: transition.id.clone(),
                    activity: endpoint.clone(),
                });
            }
        }
        self.transitions.push(transition);
        Ok(())
    }

    /// Look up an activity by id
    pub fn activity(&self, id: &ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|a| &a.id == id)
    }

    /// Look up a transition by id
    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    /// All transitions leaving an activity
    pub fn outgoing(&self, activity: &ActivityId) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| &t.source == activity)
            .collect()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_definition() -> ProcessDefinition {
        let mut def = ProcessDefinition::new("order-fulfilment");
        def.add_activity(Activity::task("pick")).unwrap();
        def.add_activity(Activity::task("pack")).unwrap();
        def.add_activity(Activity::end_event("done")).unwrap();
        def.add_transition(Transition::new(
            "flow-1",
            ActivityId::new("pick"),
            ActivityId::new("pack"),
        ))
        .unwrap();
        def.add_transition(Transition::new(
            "flow-2",
            ActivityId::new("pack"),
            ActivityId::new("done"),
        ))
        .unwrap();
        def
    }

    #[test]
    fn test_build_and_query() {
        let def = make_definition();
        assert_eq!(def.activity_count(), 3);
        assert!(def.activity(&ActivityId::new("pick")).is_some());
        assert!(def.activity(&ActivityId::new("missing")).is_none());

        let outgoing = def.outgoing(&ActivityId::new("pack"));
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].target, ActivityId::new("done"));
    }

    #[test]
    fn test_duplicate_activity_rejected() {
        let mut def = make_definition();
        let result = def.add_activity(Activity::task("pick"));
        assert!(matches!(
            result,
            Err(crate::EngineError::DuplicateActivity(_))
        ));
    }

    #[test]
    fn test_dangling_transition_rejected() {
        let mut def = make_definition();
        let result = def.add_transition(Transition::new(
            "flow-3",
            ActivityId::new("pick"),
            ActivityId::new("nowhere"),
        ));
        assert!(matches!(
            result,
            Err(crate::EngineError::UnknownTransitionEndpoint { .. })
        ));
    }

    #[test]
    fn test_activity_constructors() {
        assert!(Activity::subprocess("sub").scope);
        assert!(!Activity::subprocess("sub").event_scope);
        assert!(Activity::event_scope("boundary").event_scope);
        assert!(Activity::end_event("end").ends_process);
        assert!(!Activity::task("t").scope);
    }

    #[test]
    fn test_serde_round_trip() {
        let def = make_definition().with_history_time_to_live(Some(30));
        let json = serde_json::to_string(&def).unwrap();
        let back: ProcessDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
