//! Repository for the `workflow_instances` table.
//!
//! Only the transition engine writes to this table. The engine threads an
//! open transaction through every write so a failed transition leaves no
//! partial state.

use sqlx::PgPool;

use greenlight_core::types::DbId;

use crate::models::instance::{CreateWorkflowInstance, WorkflowInstance};
use crate::DbTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, workflow_id, workflow_version, ref_type, ref_id, \
    status, current_step_id, created_by, created_at, updated_at";

/// Provides operations for workflow instances.
pub struct InstanceRepo;

impl InstanceRepo {
    /// Insert a new instance (status IN_PROGRESS).
    ///
    /// The unique constraint `uq_workflow_instances_ref` rejects a second
    /// instance for the same `(ref_type, ref_id)` pair.
    pub async fn create(
        tx: &mut DbTx<'_>,
        input: &CreateWorkflowInstance,
    ) -> Result<WorkflowInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_instances
                (workflow_id, workflow_version, ref_type, ref_id, current_step_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(input.workflow_id)
            .bind(input.workflow_version)
            .bind(&input.ref_type)
            .bind(&input.ref_id)
            .bind(input.current_step_id)
            .bind(input.created_by)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find an instance by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_instances WHERE id = $1");
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Same as [`Self::find_by_id`] but within an open transaction.
    pub async fn find_by_id_tx(
        tx: &mut DbTx<'_>,
        id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_instances WHERE id = $1");
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Find the instance bound to a business record, if any.
    pub async fn find_by_ref(
        tx: &mut DbTx<'_>,
        ref_type: &str,
        ref_id: &str,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM workflow_instances WHERE ref_type = $1 AND ref_id = $2");
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(ref_type)
            .bind(ref_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Advance the current-step pointer of an in-progress instance.
    pub async fn set_current_step(
        tx: &mut DbTx<'_>,
        id: DbId,
        step_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_instances SET current_step_id = $1 WHERE id = $2")
            .bind(step_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Terminate an instance: set the final status and clear the pointer.
    pub async fn finish(tx: &mut DbTx<'_>, id: DbId, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_instances SET status = $1, current_step_id = NULL WHERE id = $2",
        )
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
