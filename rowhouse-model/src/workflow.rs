use rowhouse_types::{Actor, EntityId, GroupId, RoleId, RowId, StateId, StepId, Timestamp, TransitionId, UserId};
use serde::{Deserialize, Serialize};

/// One state in an entity's workflow.
///
/// States are ordered; the lowest order is the initial state assigned to
/// new rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: StateId,
    pub entity_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub order: i64,
}

impl WorkflowState {
    /// Creates a state at the given position.
    #[must_use]
    pub fn new(entity_id: EntityId, name: &str, order: i64) -> Self {
        Self {
            id: StateId::new(),
            entity_id,
            name: name.into(),
            color: String::new(),
            order,
        }
    }
}

/// A permitted transition out of a state.
///
/// Steps are keyed by (from state, action); performing an action not
/// declared for the row's current state is an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub entity_id: EntityId,
    pub from_state_id: StateId,
    pub to_state_id: StateId,
    /// Action verb shown to the caller (e.g. `Done`, `Reject`).
    pub action: String,
    /// Audience the row is shared with after the step runs.
    pub assign_to: AssignTo,
    pub order: i64,
}

impl WorkflowStep {
    /// Creates a step with no reassignment.
    #[must_use]
    pub fn new(entity_id: EntityId, from: StateId, to: StateId, action: &str) -> Self {
        Self {
            id: StepId::new(),
            entity_id,
            from_state_id: from,
            to_state_id: to,
            action: action.into(),
            assign_to: AssignTo::Private,
            order: 0,
        }
    }
}

/// Where a step routes the row after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssignTo {
    /// Leave sharing untouched.
    #[default]
    Private,
    /// Share edit access with the row's tenant.
    Tenant,
    /// Share edit access with a role.
    Role(RoleId),
    /// Share edit access with a group.
    Group(GroupId),
    /// Share edit access with one user.
    User(UserId),
}

/// Audit record of an executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWorkflowTransition {
    pub id: TransitionId,
    pub row_id: RowId,
    pub step_id: StepId,
    pub from_state_id: StateId,
    pub to_state_id: StateId,
    pub actor: Actor,
    pub created_at: Timestamp,
}

impl RowWorkflowTransition {
    /// Records an executed step, stamped now.
    #[must_use]
    pub fn new(row_id: RowId, step: &WorkflowStep, actor: Actor) -> Self {
        Self {
            id: TransitionId::new(),
            row_id,
            step_id: step.id,
            from_state_id: step.from_state_id,
            to_state_id: step.to_state_id,
            actor,
            created_at: Timestamp::now(),
        }
    }
}
