//! Workflow definition handlers: CRUD, step replacement, activation, and
//! versioning.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use greenlight_core::error::CoreError;
use greenlight_core::steps::{validate_step_list, StepSpec};
use greenlight_core::types::DbId;
use greenlight_db::models::workflow::{
    CreateWorkflowDefinition, StepDefinition, StepInput, WorkflowDefinition, WorkflowDetail,
};
use greenlight_db::repositories::{StepDefRepo, WorkflowDefRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/workflows
///
/// Creates a definition at version 1, inactive and with no steps. Steps
/// are attached with the replace-steps operation before activation.
pub async fn create_workflow(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CreateWorkflowDefinition>,
) -> AppResult<(StatusCode, Json<DataResponse<WorkflowDefinition>>)> {
    if payload.code.trim().is_empty() {
        return Err(CoreError::Validation("code must not be empty".to_string()).into());
    }
    if payload.name.trim().is_empty() {
        return Err(CoreError::Validation("name must not be empty".to_string()).into());
    }

    let workflow = WorkflowDefRepo::create(&state.pool, &payload).await?;
    tracing::info!(workflow_id = workflow.id, code = %workflow.code, "Workflow definition created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: workflow })))
}

/// GET /api/workflows
pub async fn list_workflows(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<WorkflowDefinition>>>> {
    let workflows = WorkflowDefRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: workflows }))
}

/// GET /api/workflows/{id}
pub async fn get_workflow(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowDetail>>> {
    let workflow = find_workflow(&state, id).await?;
    let steps = StepDefRepo::list_for_workflow(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: WorkflowDetail { workflow, steps },
    }))
}

/// PUT /api/workflows/{id}/steps
///
/// Replaces the entire step list. Refused while the definition is active;
/// the whole submitted list is validated before any row is touched.
pub async fn replace_steps(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
    Json(payload): Json<Vec<StepInput>>,
) -> AppResult<Json<DataResponse<Vec<StepDefinition>>>> {
    let workflow = find_workflow(&state, id).await?;
    if workflow.is_active {
        return Err(CoreError::Conflict(
            "Cannot edit the steps of an active workflow; create a new version instead"
                .to_string(),
        )
        .into());
    }

    let specs: Vec<StepSpec<'_>> = payload
        .iter()
        .map(|s| StepSpec {
            step_key: &s.step_key,
            order: s.order,
            name: &s.name,
            approver_strategy: &s.approver_strategy,
            approver_value: &s.approver_value,
            approval_mode: &s.approval_mode,
            reject_target_type: &s.reject_target_type,
            reject_target_step_key: s.reject_target_step_key.as_deref(),
            is_terminal: s.is_terminal,
        })
        .collect();
    validate_step_list(&specs).map_err(CoreError::Validation)?;

    let steps = StepDefRepo::replace_all(&state.pool, id, &payload).await?;
    tracing::info!(workflow_id = id, step_count = steps.len(), "Workflow steps replaced");
    Ok(Json(DataResponse { data: steps }))
}

/// POST /api/workflows/{id}/activate
///
/// A definition must have steps to activate. The partial unique index on
/// active codes rejects a second active version of the same code (409).
pub async fn activate_workflow(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowDefinition>>> {
    let workflow = find_workflow(&state, id).await?;
    let steps = StepDefRepo::list_for_workflow(&state.pool, id).await?;
    if steps.is_empty() {
        return Err(CoreError::Validation(
            "Cannot activate a workflow with no steps".to_string(),
        )
        .into());
    }

    WorkflowDefRepo::set_active(&state.pool, id, true).await?;
    tracing::info!(workflow_id = id, code = %workflow.code, version = workflow.version, "Workflow activated");
    find_workflow(&state, id).await.map(|w| Json(DataResponse { data: w }))
}

/// POST /api/workflows/{id}/deactivate
pub async fn deactivate_workflow(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkflowDefinition>>> {
    let workflow = find_workflow(&state, id).await?;
    WorkflowDefRepo::set_active(&state.pool, id, false).await?;
    tracing::info!(workflow_id = id, code = %workflow.code, "Workflow deactivated");
    find_workflow(&state, id).await.map(|w| Json(DataResponse { data: w }))
}

/// POST /api/workflows/{id}/versions
///
/// Clones the definition and its steps into a new inactive version.
/// In-flight instances keep running on their pinned version.
pub async fn new_version(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<WorkflowDetail>>)> {
    let Some((workflow, steps)) = WorkflowDefRepo::new_version(&state.pool, id).await? else {
        return Err(CoreError::NotFound {
            entity: "workflow",
            key: id.to_string(),
        }
        .into());
    };
    tracing::info!(
        workflow_id = workflow.id,
        code = %workflow.code,
        version = workflow.version,
        "Workflow version created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: WorkflowDetail { workflow, steps },
        }),
    ))
}

async fn find_workflow(state: &AppState, id: DbId) -> AppResult<WorkflowDefinition> {
    WorkflowDefRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "workflow",
                key: id.to_string(),
            }
            .into()
        })
}
