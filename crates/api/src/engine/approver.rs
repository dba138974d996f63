//! Transition-time approver resolution.
//!
//! Turns a step definition's parsed [`ApproverSpec`] into a concrete set
//! of user ids, reading role membership and action-log context through the
//! transition's open transaction. Resolution is read-only; a failure maps
//! to [`CoreError::Resolution`] and rolls the whole transition back.

use greenlight_core::approver::{dynamic_resolver, parse_approver_value, ApproverSpec};
use greenlight_core::error::CoreError;
use greenlight_core::types::DbId;
use greenlight_core::workflow::ApproverStrategy;
use greenlight_db::models::workflow::StepDefinition;
use greenlight_db::repositories::{ActionLogRepo, UserRepo};
use greenlight_db::DbTx;

use crate::error::AppResult;

/// Context a resolution runs against.
pub struct ResolveCtx {
    /// The user who started the instance (the `SUBMITTER` token).
    pub submitter_id: DbId,
    /// The instance whose action log feeds DYNAMIC resolution.
    pub workflow_instance_id: DbId,
}

/// Resolve the full approver set for a step.
///
/// MULTI entries resolve independently and union, preserving first-seen
/// order. An empty final set is a resolution failure; the step must never
/// open with nobody able to act on it.
pub async fn resolve_approvers(
    tx: &mut DbTx<'_>,
    step: &StepDefinition,
    ctx: &ResolveCtx,
) -> AppResult<Vec<DbId>> {
    let strategy = ApproverStrategy::parse(&step.approver_strategy)
        .map_err(CoreError::Resolution)?;
    let spec =
        parse_approver_value(strategy, &step.approver_value).map_err(|e| {
            CoreError::Resolution(format!("Step '{}': {e}", step.step_key))
        })?;

    let mut assignees = Vec::new();
    match &spec {
        ApproverSpec::Multi(parts) => {
            for part in parts {
                let ids = resolve_one(tx, part, ctx).await?;
                extend_unique(&mut assignees, ids);
            }
        }
        other => {
            let ids = resolve_one(tx, other, ctx).await?;
            extend_unique(&mut assignees, ids);
        }
    }

    if assignees.is_empty() {
        return Err(CoreError::Resolution(format!(
            "Step '{}' resolved to an empty approver set",
            step.step_key
        ))
        .into());
    }
    Ok(assignees)
}

/// Resolve one non-MULTI spec entry.
async fn resolve_one(
    tx: &mut DbTx<'_>,
    spec: &ApproverSpec,
    ctx: &ResolveCtx,
) -> AppResult<Vec<DbId>> {
    match spec {
        ApproverSpec::Submitter => Ok(vec![ctx.submitter_id]),
        ApproverSpec::Users(ids) => Ok(ids.clone()),
        ApproverSpec::Role(role_name) => {
            let ids = UserRepo::ids_by_role(tx, role_name).await?;
            if ids.is_empty() {
                return Err(CoreError::Resolution(format!(
                    "Role '{role_name}' has no active members"
                ))
                .into());
            }
            Ok(ids)
        }
        ApproverSpec::Dynamic(key) => resolve_dynamic(tx, key, ctx).await,
        // Nesting is rejected at parse time.
        ApproverSpec::Multi(_) => Err(CoreError::Resolution(
            "MULTI entries must not nest".to_string(),
        )
        .into()),
    }
}

/// Resolve a DYNAMIC key against the instance's most recent log entry.
async fn resolve_dynamic(
    tx: &mut DbTx<'_>,
    key: &str,
    ctx: &ResolveCtx,
) -> AppResult<Vec<DbId>> {
    let resolver = dynamic_resolver(key).ok_or_else(|| {
        CoreError::Resolution(format!("Unknown dynamic resolver key '{key}'"))
    })?;

    let entry = ActionLogRepo::latest_for_instance(tx, ctx.workflow_instance_id)
        .await?
        .ok_or_else(|| {
            CoreError::Resolution(format!(
                "Dynamic resolver '{key}' needs action history, but instance {} has none",
                ctx.workflow_instance_id
            ))
        })?;

    match resolver.metadata_field {
        None => Ok(vec![entry.actor_id]),
        Some(field) => {
            let value = entry
                .metadata
                .as_ref()
                .and_then(|m| m.get(field))
                .ok_or_else(|| {
                    CoreError::Resolution(format!(
                        "Dynamic resolver '{key}' needs metadata field '{field}', \
                         absent from the latest action of instance {}",
                        ctx.workflow_instance_id
                    ))
                })?;
            metadata_user_ids(key, field, value).map_err(Into::into)
        }
    }
}

/// Extract user ids from a metadata field: a single id or an id array.
fn metadata_user_ids(
    key: &str,
    field: &str,
    value: &serde_json::Value,
) -> Result<Vec<DbId>, CoreError> {
    let bad = || {
        CoreError::Resolution(format!(
            "Dynamic resolver '{key}': metadata field '{field}' must be a user id or id array"
        ))
    };
    match value {
        serde_json::Value::Number(n) => Ok(vec![n.as_i64().ok_or_else(bad)?]),
        serde_json::Value::Array(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                ids.push(item.as_i64().ok_or_else(bad)?);
            }
            if ids.is_empty() {
                return Err(bad());
            }
            Ok(ids)
        }
        _ => Err(bad()),
    }
}

/// Append ids not already present, preserving order.
fn extend_unique(acc: &mut Vec<DbId>, ids: Vec<DbId>) {
    for id in ids {
        if !acc.contains(&id) {
            acc.push(id);
        }
    }
}
