//! Workflow transitions.
//!
//! States and steps are defined through the catalog; this module executes
//! steps against rows. Who may perform a step is the caller's decision, not
//! the engine's. The only gate here is that a step keyed by (current
//! state, action) exists.

use crate::catalog::EntityWithDetails;
use crate::error::{EngineError, EngineResult};
use crate::task::run_blocking;
use rowhouse_model::{
    AccessLevel, AssignTo, AuditEntry, Grantee, PermissionGrant, Row, RowWorkflowTransition,
    WorkflowState, WorkflowStep,
};
use rowhouse_store::{AuditStore, Database, PermissionStore, RowStore, WorkflowStore};
use rowhouse_types::{RowId, Scope, Timestamp};
use tracing::info;

/// Executes workflow steps.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: WorkflowStore,
    rows: RowStore,
    permissions: PermissionStore,
    audit: AuditStore,
}

impl WorkflowEngine {
    pub fn new(db: &Database) -> Self {
        Self {
            store: WorkflowStore::new(db),
            rows: RowStore::new(db),
            permissions: PermissionStore::new(db),
            audit: AuditStore::new(db),
        }
    }

    /// Performs the named action on a row and returns the state it lands in.
    ///
    /// Fails with [`EngineError::InvalidTransition`] when the row carries no
    /// workflow state or no step with that action leaves the current state;
    /// attempting a step from the wrong state fails the same way. On
    /// success the row's state is updated, the executed step is recorded
    /// and an audit entry `From {from} to {to}` is written. A step with an
    /// `assign_to` audience also shares the row with that audience at Edit
    /// level.
    pub async fn perform_transition(
        &self,
        details: &EntityWithDetails,
        row: &Row,
        action: &str,
        scope: &Scope,
    ) -> EngineResult<WorkflowState> {
        let folio = row.display_folio(&details.def.prefix);
        let current_id = row.workflow_state_id.ok_or_else(|| {
            EngineError::InvalidTransition(format!("row {folio} has no workflow state"))
        })?;
        let current = details.state_by_id(current_id).ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "row {folio} is in an unknown workflow state"
            ))
        })?;
        let step = details
            .workflow_steps
            .iter()
            .find(|s| s.from_state_id == current_id && s.action == action)
            .ok_or_else(|| {
                EngineError::InvalidTransition(format!(
                    "no step '{action}' out of state '{}'",
                    current.name
                ))
            })?;
        let target = details.state_by_id(step.to_state_id).ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "step '{action}' points at a deleted state"
            ))
        })?;

        let transition = RowWorkflowTransition::new(row.id, step, scope.actor);
        let grant = assignment_grant(row, step);
        let entry = AuditEntry::new(
            row.tenant_id,
            scope.actor,
            &format!("From {} to {}", current.name, target.name),
            details.def.id,
            row.id,
            &folio,
        );

        let rows = self.rows.clone();
        let store = self.store.clone();
        let permissions = self.permissions.clone();
        let audit = self.audit.clone();
        let row_id = row.id;
        let to_state = step.to_state_id;
        run_blocking(move || {
            rows.set_workflow_state(row_id, to_state, Timestamp::now())?;
            store.insert_transition(&transition)?;
            if let Some(grant) = grant {
                permissions.upsert_grant(&grant)?;
            }
            audit.append(&entry)
        })
        .await?;

        info!(
            row = %folio,
            from = %current.name,
            to = %target.name,
            action,
            "workflow step performed"
        );
        Ok(target.clone())
    }

    /// The executed steps of a row, oldest first.
    pub async fn transitions(&self, row_id: RowId) -> EngineResult<Vec<RowWorkflowTransition>> {
        let store = self.store.clone();
        run_blocking(move || store.list_transitions(row_id)).await
    }
}

/// Steps available from the row's current state.
#[must_use]
pub fn next_steps(details: &EntityWithDetails, row: &Row) -> Vec<WorkflowStep> {
    match row.workflow_state_id {
        Some(state) => details
            .workflow_steps
            .iter()
            .filter(|s| s.from_state_id == state)
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

fn assignment_grant(row: &Row, step: &WorkflowStep) -> Option<PermissionGrant> {
    let grantee = match step.assign_to {
        AssignTo::Private => return None,
        AssignTo::Tenant => Grantee::Tenant(row.tenant_id?),
        AssignTo::Role(role) => Grantee::Role(role),
        AssignTo::Group(group) => Grantee::Group(group),
        AssignTo::User(user) => Grantee::User(user),
    };
    Some(PermissionGrant::new(row.id, grantee, AccessLevel::Edit))
}
