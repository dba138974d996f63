//! Workflow definition and step definition models.
//!
//! A definition is a versioned template; its step list may only change
//! while the definition is inactive. Step replacement references SPECIFIC
//! send-back targets by `step_key` (ids do not exist yet at request time)
//! and the repository resolves keys to ids after insertion.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use greenlight_core::types::{DbId, Timestamp};
use greenlight_core::workflow::APPROVAL_MODE_ANY;

/// A row from the `workflow_definitions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowDefinition {
    pub id: DbId,
    /// Stable business key shared across versions.
    pub code: String,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `workflow_steps` table.
///
/// `order_index` is the API's `order` field (reserved word in SQL).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepDefinition {
    pub id: DbId,
    pub workflow_id: DbId,
    pub step_key: String,
    pub order_index: i32,
    pub name: String,
    pub approver_strategy: String,
    pub approver_value: String,
    pub approval_mode: String,
    pub can_send_back: bool,
    pub reject_target_type: String,
    pub reject_target_step_id: Option<DbId>,
    pub is_terminal: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new workflow definition (version 1, inactive).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowDefinition {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// One step in a replace-steps request.
#[derive(Debug, Clone, Deserialize)]
pub struct StepInput {
    pub step_key: String,
    pub order: i32,
    pub name: String,
    pub approver_strategy: String,
    pub approver_value: String,
    #[serde(default = "default_approval_mode")]
    pub approval_mode: String,
    #[serde(default)]
    pub can_send_back: bool,
    #[serde(default = "default_reject_target_type")]
    pub reject_target_type: String,
    /// Required when `reject_target_type` is SPECIFIC; must name a step
    /// in the same request.
    pub reject_target_step_key: Option<String>,
    #[serde(default)]
    pub is_terminal: bool,
}

fn default_approval_mode() -> String {
    APPROVAL_MODE_ANY.to_string()
}

fn default_reject_target_type() -> String {
    "PREVIOUS".to_string()
}

/// A definition together with its ordered step list.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDetail {
    pub workflow: WorkflowDefinition,
    pub steps: Vec<StepDefinition>,
}
