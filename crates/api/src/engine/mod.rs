//! The workflow transition engine.
//!
//! Every transition (`start`, `approve`, `send_back`) runs inside one
//! database transaction: either every write of the transition commits or
//! none do. Concurrent actions on the same step instance are serialized by
//! the conditional update in `StepInstanceRepo::mark_acted`; concurrent
//! duplicate starts are serialized by the `(ref_type, ref_id)` unique
//! constraint. Only this module mutates instance, step instance, or
//! action-log state.

pub mod approver;
pub mod sendback;

use serde::Serialize;

use greenlight_core::error::CoreError;
use greenlight_core::types::DbId;
use greenlight_core::workflow::{
    ACTION_APPROVE, ACTION_SEND_BACK, ACTION_SUBMIT, INSTANCE_APPROVED, STEP_APPROVED,
    STEP_PENDING, STEP_REJECTED,
};
use greenlight_db::models::instance::{
    CreateStepInstance, CreateWorkflowInstance, WorkflowInstance,
};
use greenlight_db::models::action_log::CreateActionLogEntry;
use greenlight_db::models::workflow::StepDefinition;
use greenlight_db::repositories::{
    ActionLogRepo, InstanceRepo, StepInstanceRepo, WorkflowDefRepo,
};
use greenlight_db::{DbPool, DbTx};

use crate::error::AppResult;

use self::approver::{resolve_approvers, ResolveCtx};

/// Result of a successful `start` transition.
#[derive(Debug, Serialize)]
pub struct StartOutcome {
    pub instance_id: DbId,
    pub status: String,
    /// Key of the step now pending, or `None` if the instance completed
    /// immediately (single-step workflow).
    pub current_step: Option<String>,
    pub assignees: Vec<DbId>,
}

/// Result of a successful `approve` transition.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApproveOutcome {
    /// The instance reached APPROVED.
    Completed { status: &'static str },
    /// Control advanced to the next step.
    Advanced {
        status: &'static str,
        next_step: String,
        assignees: Vec<DbId>,
    },
}

/// Result of a successful `send_back` transition.
#[derive(Debug, Serialize)]
pub struct SendBackOutcome {
    pub status: &'static str,
    pub target_step: String,
    pub assignees: Vec<DbId>,
}

/// Transition context for an action on a pending step instance.
struct PendingAction {
    instance: WorkflowInstance,
    steps: Vec<StepDefinition>,
    /// Index of the acted-on step's definition within `steps`.
    index: usize,
}

/// The transition engine. Stateless; every method opens its own transaction.
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Start a workflow instance for a business record.
    ///
    /// The first step by order is the submit step: it is auto-approved on
    /// behalf of the submitter and a SUBMIT log entry is appended. Control
    /// then advances to the second step, or the instance completes
    /// immediately if no second step exists.
    pub async fn start(
        pool: &DbPool,
        workflow_code: &str,
        ref_type: &str,
        ref_id: &str,
        submitter_id: DbId,
    ) -> AppResult<StartOutcome> {
        let mut tx = pool.begin().await?;

        let definition = WorkflowDefRepo::find_active_by_code(&mut tx, workflow_code)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "active workflow",
                key: workflow_code.to_string(),
            })?;

        if InstanceRepo::find_by_ref(&mut tx, ref_type, ref_id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "A workflow instance already exists for {ref_type}/{ref_id}"
            ))
            .into());
        }

        let steps = WorkflowDefRepo::steps_for(&mut tx, definition.id).await?;
        let Some(submit_step) = steps.first() else {
            return Err(CoreError::Resolution(format!(
                "Workflow '{workflow_code}' has no steps"
            ))
            .into());
        };

        let instance = InstanceRepo::create(
            &mut tx,
            &CreateWorkflowInstance {
                workflow_id: definition.id,
                workflow_version: definition.version,
                ref_type: ref_type.to_string(),
                ref_id: ref_id.to_string(),
                current_step_id: submit_step.id,
                created_by: submitter_id,
            },
        )
        .await?;

        // The submit step is auto-approved on behalf of the submitter.
        StepInstanceRepo::create(
            &mut tx,
            &CreateStepInstance {
                workflow_instance_id: instance.id,
                step_id: submit_step.id,
                status: STEP_APPROVED.to_string(),
                assigned_to: vec![submitter_id],
                acted_by: Some(submitter_id),
                comment: None,
            },
        )
        .await?;

        let next = if submit_step.is_terminal {
            None
        } else {
            steps.get(1)
        };

        ActionLogRepo::append(
            &mut tx,
            &CreateActionLogEntry {
                workflow_instance_id: instance.id,
                action: ACTION_SUBMIT.to_string(),
                from_step_id: submit_step.id,
                to_step_id: next.map(|s| s.id),
                actor_id: submitter_id,
                comment: None,
                metadata: None,
            },
        )
        .await?;

        let outcome = match next {
            Some(next_step) => {
                let ctx = ResolveCtx {
                    submitter_id,
                    workflow_instance_id: instance.id,
                };
                let assignees =
                    Self::open_step(&mut tx, instance.id, next_step, &ctx).await?;
                StartOutcome {
                    instance_id: instance.id,
                    status: instance.status.clone(),
                    current_step: Some(next_step.step_key.clone()),
                    assignees,
                }
            }
            None => {
                InstanceRepo::finish(&mut tx, instance.id, INSTANCE_APPROVED).await?;
                StartOutcome {
                    instance_id: instance.id,
                    status: INSTANCE_APPROVED.to_string(),
                    current_step: None,
                    assignees: Vec::new(),
                }
            }
        };

        tx.commit().await?;
        tracing::info!(
            instance_id = outcome.instance_id,
            workflow_code,
            ref_type,
            ref_id,
            current_step = outcome.current_step.as_deref().unwrap_or("-"),
            "Workflow instance started"
        );
        Ok(outcome)
    }

    /// Approve a pending step instance as `actor_id`.
    ///
    /// Advances control to the next step by order, or completes the
    /// instance if the current step is terminal or last.
    pub async fn approve(
        pool: &DbPool,
        step_instance_id: DbId,
        actor_id: DbId,
        comment: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<ApproveOutcome> {
        let mut tx = pool.begin().await?;

        let action = Self::load_pending(&mut tx, step_instance_id, actor_id).await?;
        let current = &action.steps[action.index];

        // The PENDING guard in mark_acted decides races: the loser of two
        // concurrent approvals sees None here.
        StepInstanceRepo::mark_acted(&mut tx, step_instance_id, STEP_APPROVED, actor_id, comment)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Step instance {step_instance_id} has already been acted on"
                ))
            })?;

        let next = if current.is_terminal {
            None
        } else {
            action.steps.get(action.index + 1)
        };

        ActionLogRepo::append(
            &mut tx,
            &CreateActionLogEntry {
                workflow_instance_id: action.instance.id,
                action: ACTION_APPROVE.to_string(),
                from_step_id: current.id,
                to_step_id: next.map(|s| s.id),
                actor_id,
                comment: comment.map(str::to_string),
                metadata,
            },
        )
        .await?;

        let outcome = match next {
            Some(next_step) => {
                let ctx = ResolveCtx {
                    submitter_id: action.instance.created_by,
                    workflow_instance_id: action.instance.id,
                };
                let assignees =
                    Self::open_step(&mut tx, action.instance.id, next_step, &ctx).await?;
                ApproveOutcome::Advanced {
                    status: "IN_PROGRESS",
                    next_step: next_step.step_key.clone(),
                    assignees,
                }
            }
            None => {
                InstanceRepo::finish(&mut tx, action.instance.id, INSTANCE_APPROVED).await?;
                ApproveOutcome::Completed {
                    status: "COMPLETED",
                }
            }
        };

        tx.commit().await?;
        tracing::info!(
            step_instance_id,
            instance_id = action.instance.id,
            actor_id,
            "Step approved"
        );
        Ok(outcome)
    }

    /// Send a pending step instance back to an earlier step as `actor_id`.
    ///
    /// The current step instance ends REJECTED; a fresh PENDING step
    /// instance is created at the routing target with freshly resolved
    /// approvers. The instance stays IN_PROGRESS.
    pub async fn send_back(
        pool: &DbPool,
        step_instance_id: DbId,
        actor_id: DbId,
        comment: &str,
    ) -> AppResult<SendBackOutcome> {
        let mut tx = pool.begin().await?;

        let action = Self::load_pending(&mut tx, step_instance_id, actor_id).await?;
        let current = &action.steps[action.index];

        if !current.can_send_back {
            return Err(CoreError::Forbidden(format!(
                "Step '{}' does not allow send-back",
                current.step_key
            ))
            .into());
        }

        let target = sendback::resolve_target(current, &action.steps)?;

        StepInstanceRepo::mark_acted(
            &mut tx,
            step_instance_id,
            STEP_REJECTED,
            actor_id,
            Some(comment),
        )
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "Step instance {step_instance_id} has already been acted on"
            ))
        })?;

        ActionLogRepo::append(
            &mut tx,
            &CreateActionLogEntry {
                workflow_instance_id: action.instance.id,
                action: ACTION_SEND_BACK.to_string(),
                from_step_id: current.id,
                to_step_id: Some(target.id),
                actor_id,
                comment: Some(comment.to_string()),
                metadata: None,
            },
        )
        .await?;

        // Approvers are resolved fresh for the revisit; role membership or
        // dynamic context may have changed since the original visit.
        let ctx = ResolveCtx {
            submitter_id: action.instance.created_by,
            workflow_instance_id: action.instance.id,
        };
        let assignees = Self::open_step(&mut tx, action.instance.id, target, &ctx).await?;

        tx.commit().await?;
        tracing::info!(
            step_instance_id,
            instance_id = action.instance.id,
            actor_id,
            target_step = %target.step_key,
            "Step sent back"
        );
        Ok(SendBackOutcome {
            status: "SENT_BACK",
            target_step: target.step_key.clone(),
            assignees,
        })
    }

    /// Load a step instance and its transition context, enforcing the
    /// shared preconditions of `approve` and `send_back`.
    async fn load_pending(
        tx: &mut DbTx<'_>,
        step_instance_id: DbId,
        actor_id: DbId,
    ) -> AppResult<PendingAction> {
        let step_instance = StepInstanceRepo::find_by_id(tx, step_instance_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "step instance",
                key: step_instance_id.to_string(),
            })?;

        if step_instance.status != STEP_PENDING {
            return Err(CoreError::Conflict(format!(
                "Step instance {step_instance_id} is {}, not {STEP_PENDING}",
                step_instance.status
            ))
            .into());
        }

        if !step_instance.assigned_to.0.contains(&actor_id) {
            return Err(CoreError::Forbidden(
                "You are not an assigned approver for this step".to_string(),
            )
            .into());
        }

        let instance = InstanceRepo::find_by_id_tx(tx, step_instance.workflow_instance_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "workflow instance",
                key: step_instance.workflow_instance_id.to_string(),
            })?;

        let steps = WorkflowDefRepo::steps_for(tx, instance.workflow_id).await?;
        let index = steps
            .iter()
            .position(|s| s.id == step_instance.step_id)
            .ok_or_else(|| {
                CoreError::Resolution(format!(
                    "Step definition {} is missing from workflow {}",
                    step_instance.step_id, instance.workflow_id
                ))
            })?;

        Ok(PendingAction {
            instance,
            steps,
            index,
        })
    }

    /// Resolve a step's approvers and open a PENDING step instance for it,
    /// advancing the instance pointer. Returns the resolved assignee set.
    async fn open_step(
        tx: &mut DbTx<'_>,
        workflow_instance_id: DbId,
        step: &StepDefinition,
        ctx: &ResolveCtx,
    ) -> AppResult<Vec<DbId>> {
        let assignees = resolve_approvers(tx, step, ctx).await?;
        StepInstanceRepo::create(
            tx,
            &CreateStepInstance {
                workflow_instance_id,
                step_id: step.id,
                status: STEP_PENDING.to_string(),
                assigned_to: assignees.clone(),
                acted_by: None,
                comment: None,
            },
        )
        .await?;
        InstanceRepo::set_current_step(tx, workflow_instance_id, step.id).await?;
        Ok(assignees)
    }
}
