//! Workflow instance handlers: start, inspect, and act on steps.
//!
//! These are thin wrappers over [`WorkflowEngine`]; the engine owns all
//! transition semantics and atomicity.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use greenlight_core::error::CoreError;
use greenlight_core::types::DbId;
use greenlight_db::models::action_log::ActionLogEntry;
use greenlight_db::models::instance::{StepInstance, WorkflowInstance};
use greenlight_db::repositories::{ActionLogRepo, InstanceRepo, StepInstanceRepo};

use crate::engine::{ApproveOutcome, SendBackOutcome, StartOutcome, WorkflowEngine};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub workflow_code: String,
    pub ref_type: String,
    pub ref_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveRequest {
    #[serde(default)]
    pub comment: Option<String>,
    /// Free-form context recorded on the log entry; later DYNAMIC steps
    /// may read fields from it (e.g. `selected_pic`).
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SendBackRequest {
    pub comment: String,
}

/// An instance with its full step-instance history.
#[derive(Debug, Serialize)]
pub struct InstanceDetail {
    pub instance: WorkflowInstance,
    pub steps: Vec<StepInstance>,
}

/// POST /api/instances
pub async fn start_instance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<StartRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<StartOutcome>>)> {
    for (field, value) in [
        ("workflow_code", &payload.workflow_code),
        ("ref_type", &payload.ref_type),
        ("ref_id", &payload.ref_id),
    ] {
        if value.trim().is_empty() {
            return Err(
                CoreError::Validation(format!("{field} must not be empty")).into(),
            );
        }
    }

    let outcome = WorkflowEngine::start(
        &state.pool,
        &payload.workflow_code,
        &payload.ref_type,
        &payload.ref_id,
        auth.user_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// GET /api/instances/{id}
pub async fn get_instance(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<InstanceDetail>>> {
    let instance = InstanceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "workflow instance",
            key: id.to_string(),
        })?;
    let steps = StepInstanceRepo::list_for_instance(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: InstanceDetail { instance, steps },
    }))
}

/// GET /api/instances/{id}/log
pub async fn get_action_log(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ActionLogEntry>>>> {
    if InstanceRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "workflow instance",
            key: id.to_string(),
        }
        .into());
    }
    let entries = ActionLogRepo::list_for_instance(&state.pool, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/step-instances/{id}/approve
pub async fn approve_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(payload): Json<ApproveRequest>,
) -> AppResult<Json<DataResponse<ApproveOutcome>>> {
    let outcome = WorkflowEngine::approve(
        &state.pool,
        id,
        auth.user_id,
        payload.comment.as_deref(),
        payload.metadata,
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/step-instances/{id}/send-back
///
/// A comment is mandatory: the submitter must learn why the record came
/// back.
pub async fn send_back_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(payload): Json<SendBackRequest>,
) -> AppResult<Json<DataResponse<SendBackOutcome>>> {
    if payload.comment.trim().is_empty() {
        return Err(
            CoreError::Validation("comment is required for send-back".to_string()).into(),
        );
    }
    let outcome =
        WorkflowEngine::send_back(&state.pool, id, auth.user_id, payload.comment.trim()).await?;
    Ok(Json(DataResponse { data: outcome }))
}
