//! Repository for the `workflow_steps` table.

use std::collections::HashMap;

use sqlx::PgPool;

use greenlight_core::types::DbId;
use greenlight_core::workflow::RejectTargetType;

use crate::models::workflow::{StepDefinition, StepInput};
use crate::DbTx;

/// Column list shared across queries to avoid repetition. Public so the
/// definition repo can reuse it for its step queries.
pub const STEP_COLUMNS: &str = "id, workflow_id, step_key, order_index, name, \
    approver_strategy, approver_value, approval_mode, can_send_back, \
    reject_target_type, reject_target_step_id, is_terminal, created_at, updated_at";

/// Provides operations for step definitions.
pub struct StepDefRepo;

impl StepDefRepo {
    /// Find a step by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StepDefinition>, sqlx::Error> {
        let query = format!("SELECT {STEP_COLUMNS} FROM workflow_steps WHERE id = $1");
        sqlx::query_as::<_, StepDefinition>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a workflow's steps ordered by `order_index`.
    pub async fn list_for_workflow(
        pool: &PgPool,
        workflow_id: DbId,
    ) -> Result<Vec<StepDefinition>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps
             WHERE workflow_id = $1
             ORDER BY order_index"
        );
        sqlx::query_as::<_, StepDefinition>(&query)
            .bind(workflow_id)
            .fetch_all(pool)
            .await
    }

    /// Atomically replace a workflow's entire step list.
    ///
    /// Deletes all existing steps and inserts the new list in one
    /// transaction. SPECIFIC send-back targets arrive as step keys and are
    /// resolved to the freshly inserted ids in a second pass. The input is
    /// assumed to have passed `validate_step_list`.
    pub async fn replace_all(
        pool: &PgPool,
        workflow_id: DbId,
        steps: &[StepInput],
    ) -> Result<Vec<StepDefinition>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = $1")
            .bind(workflow_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(steps.len());
        for step in steps {
            let query = format!(
                "INSERT INTO workflow_steps
                    (workflow_id, step_key, order_index, name, approver_strategy,
                     approver_value, approval_mode, can_send_back, reject_target_type,
                     is_terminal)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING {STEP_COLUMNS}"
            );
            let row = sqlx::query_as::<_, StepDefinition>(&query)
                .bind(workflow_id)
                .bind(&step.step_key)
                .bind(step.order)
                .bind(&step.name)
                .bind(&step.approver_strategy)
                .bind(&step.approver_value)
                .bind(&step.approval_mode)
                .bind(step.can_send_back)
                .bind(&step.reject_target_type)
                .bind(step.is_terminal)
                .fetch_one(&mut *tx)
                .await?;
            inserted.push(row);
        }

        // Second pass: resolve SPECIFIC target keys to the new ids.
        let ids_by_key: HashMap<String, DbId> = inserted
            .iter()
            .map(|s| (s.step_key.clone(), s.id))
            .collect();
        for (input, row) in steps.iter().zip(inserted.iter_mut()) {
            if input.reject_target_type != RejectTargetType::Specific.as_str() {
                continue;
            }
            let target_id = input
                .reject_target_step_key
                .as_deref()
                .and_then(|key| ids_by_key.get(key).copied());
            sqlx::query("UPDATE workflow_steps SET reject_target_step_id = $1 WHERE id = $2")
                .bind(target_id)
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            row.reject_target_step_id = target_id;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Copy all steps of `from_workflow` to `to_workflow`, remapping
    /// SPECIFIC target ids to the cloned rows. Used by definition
    /// versioning; runs inside the caller's transaction.
    pub async fn clone_steps(
        tx: &mut DbTx<'_>,
        from_workflow: DbId,
        to_workflow: DbId,
    ) -> Result<Vec<StepDefinition>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps
             WHERE workflow_id = $1
             ORDER BY order_index"
        );
        let originals = sqlx::query_as::<_, StepDefinition>(&query)
            .bind(from_workflow)
            .fetch_all(&mut **tx)
            .await?;

        let mut id_map: HashMap<DbId, DbId> = HashMap::new();
        let mut clones = Vec::with_capacity(originals.len());
        for step in &originals {
            let query = format!(
                "INSERT INTO workflow_steps
                    (workflow_id, step_key, order_index, name, approver_strategy,
                     approver_value, approval_mode, can_send_back, reject_target_type,
                     is_terminal)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING {STEP_COLUMNS}"
            );
            let clone = sqlx::query_as::<_, StepDefinition>(&query)
                .bind(to_workflow)
                .bind(&step.step_key)
                .bind(step.order_index)
                .bind(&step.name)
                .bind(&step.approver_strategy)
                .bind(&step.approver_value)
                .bind(&step.approval_mode)
                .bind(step.can_send_back)
                .bind(&step.reject_target_type)
                .bind(step.is_terminal)
                .fetch_one(&mut **tx)
                .await?;
            id_map.insert(step.id, clone.id);
            clones.push(clone);
        }

        for (original, clone) in originals.iter().zip(clones.iter_mut()) {
            let Some(old_target) = original.reject_target_step_id else {
                continue;
            };
            let new_target = id_map.get(&old_target).copied();
            sqlx::query("UPDATE workflow_steps SET reject_target_step_id = $1 WHERE id = $2")
                .bind(new_target)
                .bind(clone.id)
                .execute(&mut **tx)
                .await?;
            clone.reject_target_step_id = new_target;
        }

        Ok(clones)
    }
}
