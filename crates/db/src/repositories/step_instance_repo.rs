//! Repository for the `step_instances` table.

use sqlx::types::Json;
use sqlx::PgPool;

use greenlight_core::types::DbId;
use greenlight_core::workflow::STEP_PENDING;

use crate::models::instance::{CreateStepInstance, InboxItem, StepInstance};
use crate::DbTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, workflow_instance_id, step_id, status, assigned_to, \
    acted_by, acted_at, comment, created_at, updated_at";

/// Provides operations for step instances.
pub struct StepInstanceRepo;

impl StepInstanceRepo {
    /// Insert a step instance.
    ///
    /// When `acted_by` is set the row is created already acted upon (the
    /// auto-approved submit step) and `acted_at` is stamped at insert.
    pub async fn create(
        tx: &mut DbTx<'_>,
        input: &CreateStepInstance,
    ) -> Result<StepInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO step_instances
                (workflow_instance_id, step_id, status, assigned_to, acted_by, acted_at, comment)
             VALUES ($1, $2, $3, $4, $5, CASE WHEN $5::bigint IS NULL THEN NULL ELSE now() END, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StepInstance>(&query)
            .bind(input.workflow_instance_id)
            .bind(input.step_id)
            .bind(&input.status)
            .bind(Json(&input.assigned_to))
            .bind(input.acted_by)
            .bind(&input.comment)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a step instance by its primary key, within an open transaction.
    pub async fn find_by_id(
        tx: &mut DbTx<'_>,
        id: DbId,
    ) -> Result<Option<StepInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM step_instances WHERE id = $1");
        sqlx::query_as::<_, StepInstance>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Conditionally flip a PENDING step instance to its final status,
    /// stamping the actor, time, and comment.
    ///
    /// The `status = 'PENDING'` guard makes concurrent actions on the same
    /// row race safely: exactly one caller gets the updated row back, every
    /// other caller gets `None` and must report a conflict.
    pub async fn mark_acted(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: &str,
        acted_by: DbId,
        comment: Option<&str>,
    ) -> Result<Option<StepInstance>, sqlx::Error> {
        let query = format!(
            "UPDATE step_instances
             SET status = $1, acted_by = $2, acted_at = now(), comment = $3
             WHERE id = $4 AND status = '{STEP_PENDING}'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StepInstance>(&query)
            .bind(status)
            .bind(acted_by)
            .bind(comment)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List every step instance of a workflow instance, oldest first.
    pub async fn list_for_instance(
        pool: &PgPool,
        workflow_instance_id: DbId,
    ) -> Result<Vec<StepInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_instances
             WHERE workflow_instance_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, StepInstance>(&query)
            .bind(workflow_instance_id)
            .fetch_all(pool)
            .await
    }

    /// Pending inbox rows for a user: PENDING step instances whose
    /// assignee snapshot contains the user.
    pub async fn inbox_pending(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<InboxItem>, sqlx::Error> {
        sqlx::query_as::<_, InboxItem>(
            "SELECT si.id AS step_instance_id, wd.name AS workflow_title,
                    ws.name AS step_name, ws.step_key, si.status,
                    u.username AS requested_by, si.created_at,
                    wi.ref_type, wi.ref_id
             FROM step_instances si
             JOIN workflow_instances wi ON wi.id = si.workflow_instance_id
             JOIN workflow_steps ws ON ws.id = si.step_id
             JOIN workflow_definitions wd ON wd.id = wi.workflow_id
             JOIN users u ON u.id = wi.created_by
             WHERE si.status = 'PENDING' AND si.assigned_to @> to_jsonb($1::bigint)
             ORDER BY si.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// History rows for a user: step instances the user has acted on.
    pub async fn inbox_history(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<InboxItem>, sqlx::Error> {
        sqlx::query_as::<_, InboxItem>(
            "SELECT si.id AS step_instance_id, wd.name AS workflow_title,
                    ws.name AS step_name, ws.step_key, si.status,
                    u.username AS requested_by, si.created_at,
                    wi.ref_type, wi.ref_id
             FROM step_instances si
             JOIN workflow_instances wi ON wi.id = si.workflow_instance_id
             JOIN workflow_steps ws ON ws.id = si.step_id
             JOIN workflow_definitions wd ON wd.id = wi.workflow_id
             JOIN users u ON u.id = wi.created_by
             WHERE si.acted_by = $1
             ORDER BY si.acted_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
