//! Persistence for workflow definitions and the per-row transition trail.

use rowhouse_model::{RowWorkflowTransition, WorkflowState, WorkflowStep};
use rowhouse_types::{EntityId, RowId, StateId, StepId, Timestamp};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_col, json_col, json_param, Database};
use crate::error::StoreResult;

/// Store facade for workflow records.
#[derive(Clone)]
pub struct WorkflowStore {
    db: Database,
}

impl WorkflowStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    // ── States ──────────────────────────────────────────────────────────────

    pub fn insert_state(&self, state: &WorkflowState) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO workflow_states (id, entity_id, name, color, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                state.id.to_string(),
                state.entity_id.to_string(),
                state.name,
                state.color,
                state.order,
            ],
        )?;
        Ok(())
    }

    pub fn update_state(&self, state: &WorkflowState) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE workflow_states SET name = ?2, color = ?3, position = ?4 WHERE id = ?1",
            params![state.id.to_string(), state.name, state.color, state.order],
        )?;
        Ok(())
    }

    pub fn get_state(&self, id: StateId) -> StoreResult<Option<WorkflowState>> {
        let conn = self.db.conn();
        let state = conn
            .query_row(
                "SELECT id, entity_id, name, color, position FROM workflow_states WHERE id = ?1",
                params![id.to_string()],
                map_state,
            )
            .optional()?;
        Ok(state)
    }

    pub fn list_states(&self, entity_id: EntityId) -> StoreResult<Vec<WorkflowState>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, name, color, position FROM workflow_states
             WHERE entity_id = ?1 ORDER BY position",
        )?;
        let states = stmt
            .query_map(params![entity_id.to_string()], map_state)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(states)
    }

    /// The lowest-positioned state, which new rows start in.
    pub fn initial_state(&self, entity_id: EntityId) -> StoreResult<Option<WorkflowState>> {
        let conn = self.db.conn();
        let state = conn
            .query_row(
                "SELECT id, entity_id, name, color, position FROM workflow_states
                 WHERE entity_id = ?1 ORDER BY position LIMIT 1",
                params![entity_id.to_string()],
                map_state,
            )
            .optional()?;
        Ok(state)
    }

    /// Removes a state and the steps touching it.
    pub fn delete_state(&self, id: StateId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = id.to_string();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM workflow_steps WHERE from_state_id = ?1 OR to_state_id = ?1",
            params![key],
        )?;
        tx.execute("DELETE FROM workflow_states WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    // ── Steps ───────────────────────────────────────────────────────────────

    pub fn insert_step(&self, step: &WorkflowStep) -> StoreResult<()> {
        let assign_to = json_param(&step.assign_to)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO workflow_steps (id, entity_id, from_state_id, to_state_id, action,
                 assign_to, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                step.id.to_string(),
                step.entity_id.to_string(),
                step.from_state_id.to_string(),
                step.to_state_id.to_string(),
                step.action,
                assign_to,
                step.order,
            ],
        )?;
        Ok(())
    }

    pub fn delete_step(&self, id: StepId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM workflow_steps WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_steps(&self, entity_id: EntityId) -> StoreResult<Vec<WorkflowStep>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{STEP_SELECT} WHERE entity_id = ?1 ORDER BY position"
        ))?;
        let steps = stmt
            .query_map(params![entity_id.to_string()], map_step)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    /// Steps leaving one state, in declared order.
    pub fn steps_from(&self, state_id: StateId) -> StoreResult<Vec<WorkflowStep>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{STEP_SELECT} WHERE from_state_id = ?1 ORDER BY position"
        ))?;
        let steps = stmt
            .query_map(params![state_id.to_string()], map_step)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    /// The step keyed by (current state, action), if declared.
    pub fn find_step(&self, from: StateId, action: &str) -> StoreResult<Option<WorkflowStep>> {
        let conn = self.db.conn();
        let step = conn
            .query_row(
                &format!("{STEP_SELECT} WHERE from_state_id = ?1 AND action = ?2"),
                params![from.to_string(), action],
                map_step,
            )
            .optional()?;
        Ok(step)
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    pub fn insert_transition(&self, transition: &RowWorkflowTransition) -> StoreResult<()> {
        let actor = json_param(&transition.actor)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO row_workflow_transitions (id, row_id, step_id, from_state_id,
                 to_state_id, actor, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                transition.id.to_string(),
                transition.row_id.to_string(),
                transition.step_id.to_string(),
                transition.from_state_id.to_string(),
                transition.to_state_id.to_string(),
                actor,
                transition.created_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn list_transitions(&self, row_id: RowId) -> StoreResult<Vec<RowWorkflowTransition>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, row_id, step_id, from_state_id, to_state_id, actor, created_at
             FROM row_workflow_transitions WHERE row_id = ?1 ORDER BY created_at",
        )?;
        let transitions = stmt
            .query_map(params![row_id.to_string()], |row| {
                Ok(RowWorkflowTransition {
                    id: id_col(row, 0)?,
                    row_id: id_col(row, 1)?,
                    step_id: id_col(row, 2)?,
                    from_state_id: id_col(row, 3)?,
                    to_state_id: id_col(row, 4)?,
                    actor: json_col(row, 5)?,
                    created_at: Timestamp::from_millis(row.get(6)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transitions)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────

fn map_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowState> {
    Ok(WorkflowState {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        order: row.get(4)?,
    })
}

const STEP_SELECT: &str = "SELECT id, entity_id, from_state_id, to_state_id, action, assign_to,
    position
    FROM workflow_steps";

fn map_step(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowStep> {
    Ok(WorkflowStep {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        from_state_id: id_col(row, 2)?,
        to_state_id: id_col(row, 3)?,
        action: row.get(4)?,
        assign_to: json_col(row, 5)?,
        order: row.get(6)?,
    })
}
