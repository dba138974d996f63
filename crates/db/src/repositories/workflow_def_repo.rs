//! Repository for the `workflow_definitions` table.

use sqlx::PgPool;

use greenlight_core::types::DbId;

use crate::models::workflow::{CreateWorkflowDefinition, StepDefinition, WorkflowDefinition};
use crate::repositories::step_def_repo::{StepDefRepo, STEP_COLUMNS};
use crate::DbTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code, version, name, description, is_active, created_at, updated_at";

/// Provides CRUD and versioning operations for workflow definitions.
pub struct WorkflowDefRepo;

impl WorkflowDefRepo {
    /// Insert a new definition at version 1, inactive, with no steps.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkflowDefinition,
    ) -> Result<WorkflowDefinition, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_definitions (code, version, name, description)
             VALUES ($1, 1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a definition by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowDefinition>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_definitions WHERE id = $1");
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the single active definition for a business code, if any.
    pub async fn find_active_by_code(
        tx: &mut DbTx<'_>,
        code: &str,
    ) -> Result<Option<WorkflowDefinition>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM workflow_definitions WHERE code = $1 AND is_active");
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List all definitions, newest versions of each code first.
    pub async fn list(pool: &PgPool) -> Result<Vec<WorkflowDefinition>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM workflow_definitions ORDER BY code, version DESC");
        sqlx::query_as::<_, WorkflowDefinition>(&query)
            .fetch_all(pool)
            .await
    }

    /// Toggle `is_active`. Returns `true` if a row was updated.
    ///
    /// Activation relies on the partial unique index
    /// `uq_workflow_definitions_active_code` to reject a second active
    /// version of the same code (surfaces as a 23505 conflict).
    pub async fn set_active(pool: &PgPool, id: DbId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE workflow_definitions SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clone a definition and its steps into a new inactive row with
    /// `version + 1`. The original and its in-flight instances are left
    /// untouched. Returns the new definition.
    pub async fn new_version(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<(WorkflowDefinition, Vec<StepDefinition>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM workflow_definitions WHERE id = $1");
        let Some(original) = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO workflow_definitions (code, version, name, description)
             SELECT code, version + 1, name, description
             FROM workflow_definitions WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let clone = sqlx::query_as::<_, WorkflowDefinition>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let steps = StepDefRepo::clone_steps(&mut tx, original.id, clone.id).await?;

        tx.commit().await?;
        Ok(Some((clone, steps)))
    }

    /// Load a definition's ordered step list within an open transaction.
    pub async fn steps_for(
        tx: &mut DbTx<'_>,
        workflow_id: DbId,
    ) -> Result<Vec<StepDefinition>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps
             WHERE workflow_id = $1
             ORDER BY order_index"
        );
        sqlx::query_as::<_, StepDefinition>(&query)
            .bind(workflow_id)
            .fetch_all(&mut **tx)
            .await
    }
}
