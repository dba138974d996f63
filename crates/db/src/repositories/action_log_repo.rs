//! Repository for the append-only `action_log` table.
//!
//! Entries are only ever inserted. There is no update or delete method by
//! design; the log doubles as the audit trail and as the context source
//! for DYNAMIC approver resolution.

use sqlx::PgPool;

use greenlight_core::types::DbId;

use crate::models::action_log::{ActionLogEntry, CreateActionLogEntry};
use crate::DbTx;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, workflow_instance_id, action, from_step_id, to_step_id, \
    actor_id, comment, metadata, created_at";

/// Provides append and read operations for the action log.
pub struct ActionLogRepo;

impl ActionLogRepo {
    /// Append an entry within the transition's transaction.
    pub async fn append(
        tx: &mut DbTx<'_>,
        input: &CreateActionLogEntry,
    ) -> Result<ActionLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO action_log
                (workflow_instance_id, action, from_step_id, to_step_id, actor_id, comment, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionLogEntry>(&query)
            .bind(input.workflow_instance_id)
            .bind(&input.action)
            .bind(input.from_step_id)
            .bind(input.to_step_id)
            .bind(input.actor_id)
            .bind(&input.comment)
            .bind(&input.metadata)
            .fetch_one(&mut **tx)
            .await
    }

    /// List all entries for an instance, oldest first.
    pub async fn list_for_instance(
        pool: &PgPool,
        workflow_instance_id: DbId,
    ) -> Result<Vec<ActionLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_log
             WHERE workflow_instance_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, ActionLogEntry>(&query)
            .bind(workflow_instance_id)
            .fetch_all(pool)
            .await
    }

    /// The most recent entry for an instance, used by DYNAMIC resolution.
    pub async fn latest_for_instance(
        tx: &mut DbTx<'_>,
        workflow_instance_id: DbId,
    ) -> Result<Option<ActionLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_log
             WHERE workflow_instance_id = $1
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ActionLogEntry>(&query)
            .bind(workflow_instance_id)
            .fetch_optional(&mut **tx)
            .await
    }
}
