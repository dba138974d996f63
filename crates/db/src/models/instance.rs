//! Workflow instance and step instance models.
//!
//! An instance binds one definition version to one `(ref_type, ref_id)`
//! business record. Step instances record every visit to a step; a step
//! may be visited more than once via send-back. `assigned_to` is a JSONB
//! snapshot of the approver set resolved when the row was created - later
//! role membership changes never alter who may act on an existing row.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use greenlight_core::types::{DbId, Timestamp};

/// A row from the `workflow_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowInstance {
    pub id: DbId,
    pub workflow_id: DbId,
    /// Pinned at creation; later definition edits never affect this instance.
    pub workflow_version: i32,
    pub ref_type: String,
    pub ref_id: String,
    pub status: String,
    /// Null once the instance reaches a terminal status.
    pub current_step_id: Option<DbId>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `step_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepInstance {
    pub id: DbId,
    pub workflow_instance_id: DbId,
    pub step_id: DbId,
    pub status: String,
    /// Snapshot of the resolved approver set.
    pub assigned_to: Json<Vec<DbId>>,
    pub acted_by: Option<DbId>,
    pub acted_at: Option<Timestamp>,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a workflow instance.
#[derive(Debug, Clone)]
pub struct CreateWorkflowInstance {
    pub workflow_id: DbId,
    pub workflow_version: i32,
    pub ref_type: String,
    pub ref_id: String,
    pub current_step_id: DbId,
    pub created_by: DbId,
}

/// DTO for creating a step instance.
///
/// `acted_by: Some(_)` creates an already-acted row (the auto-approved
/// submit step); the repository stamps `acted_at` in that case.
#[derive(Debug, Clone)]
pub struct CreateStepInstance {
    pub workflow_instance_id: DbId,
    pub step_id: DbId,
    pub status: String,
    pub assigned_to: Vec<DbId>,
    pub acted_by: Option<DbId>,
    pub comment: Option<String>,
}

/// One row of a user's inbox (pending work) or action history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InboxItem {
    pub step_instance_id: DbId,
    pub workflow_title: String,
    pub step_name: String,
    pub step_key: String,
    pub status: String,
    pub requested_by: String,
    pub created_at: Timestamp,
    pub ref_type: String,
    pub ref_id: String,
}

/// Inbox query mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxMode {
    Pending,
    History,
}
