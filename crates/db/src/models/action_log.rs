//! Action log entry model.
//!
//! The action log is append-only: entries are never updated or deleted
//! while their instance exists, so there is no `updated_at`. Besides the
//! audit trail, the `metadata` payload feeds context-dependent approver
//! resolution (e.g. which user was selected for a later DYNAMIC step).

use serde::Serialize;
use sqlx::FromRow;

use greenlight_core::types::{DbId, Timestamp};

/// A row from the `action_log` table. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionLogEntry {
    pub id: DbId,
    pub workflow_instance_id: DbId,
    /// One of SUBMIT, APPROVE, SEND_BACK.
    pub action: String,
    pub from_step_id: DbId,
    pub to_step_id: Option<DbId>,
    pub actor_id: DbId,
    pub comment: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for appending an action log entry.
#[derive(Debug, Clone)]
pub struct CreateActionLogEntry {
    pub workflow_instance_id: DbId,
    pub action: String,
    pub from_step_id: DbId,
    pub to_step_id: Option<DbId>,
    pub actor_id: DbId,
    pub comment: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
