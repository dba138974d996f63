//! Send-back routing.
//!
//! Pure target selection over the definition's ordered step list. An
//! unresolvable target is a configuration error that aborts the enclosing
//! transition; routing never silently falls through.

use greenlight_core::error::CoreError;
use greenlight_core::workflow::RejectTargetType;
use greenlight_db::models::workflow::StepDefinition;

/// Pick the step a send-back from `current` routes to.
///
/// `steps` is the full step list of the owning definition, ordered by
/// `order_index`.
pub fn resolve_target<'a>(
    current: &StepDefinition,
    steps: &'a [StepDefinition],
) -> Result<&'a StepDefinition, CoreError> {
    let target_type = RejectTargetType::parse(&current.reject_target_type)
        .map_err(CoreError::Resolution)?;

    match target_type {
        RejectTargetType::Previous => {
            let index = steps
                .iter()
                .position(|s| s.id == current.id)
                .ok_or_else(|| {
                    CoreError::Resolution(format!(
                        "Step '{}' is not in its workflow's step list",
                        current.step_key
                    ))
                })?;
            if index == 0 {
                return Err(CoreError::Resolution(format!(
                    "Step '{}' is the first step; there is no previous step to send back to",
                    current.step_key
                )));
            }
            Ok(&steps[index - 1])
        }
        RejectTargetType::Specific => {
            let target_id = current.reject_target_step_id.ok_or_else(|| {
                CoreError::Resolution(format!(
                    "Step '{}' routes to a SPECIFIC target but has none configured",
                    current.step_key
                ))
            })?;
            steps.iter().find(|s| s.id == target_id).ok_or_else(|| {
                CoreError::Resolution(format!(
                    "Step '{}' routes to step id {target_id}, which is not in its workflow",
                    current.step_key
                ))
            })
        }
    }
}
