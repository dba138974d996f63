//! Step-list validation for workflow definitions.
//!
//! A replace-steps request is validated as a whole before any row is
//! touched: keys and orders must be unique, at most one step may be
//! terminal, approver payloads must parse under their strategy, and
//! SPECIFIC send-back targets must reference a step in the submitted set.

use std::collections::HashSet;

use crate::approver::parse_approver_value;
use crate::workflow::{validate_approval_mode, ApproverStrategy, RejectTargetType};

/// A lightweight view of one submitted step, decoupled from the DB DTOs.
#[derive(Debug, Clone)]
pub struct StepSpec<'a> {
    pub step_key: &'a str,
    pub order: i32,
    pub name: &'a str,
    pub approver_strategy: &'a str,
    pub approver_value: &'a str,
    pub approval_mode: &'a str,
    pub reject_target_type: &'a str,
    /// SPECIFIC targets reference the target step by key within the set.
    pub reject_target_step_key: Option<&'a str>,
    pub is_terminal: bool,
}

/// Validate a full replacement step list.
///
/// Errors name the offending step and field so definition editors get a
/// per-field message rather than a generic failure.
pub fn validate_step_list(steps: &[StepSpec<'_>]) -> Result<(), String> {
    if steps.is_empty() {
        return Err("A workflow must have at least one step".to_string());
    }

    let mut keys = HashSet::new();
    let mut orders = HashSet::new();
    let mut terminal_count = 0;

    for step in steps {
        if step.step_key.trim().is_empty() {
            return Err("Each step must have a non-empty step_key".to_string());
        }
        if step.name.trim().is_empty() {
            return Err(format!("Step '{}': name must not be empty", step.step_key));
        }
        if !keys.insert(step.step_key) {
            return Err(format!("Duplicate step_key '{}'", step.step_key));
        }
        if !orders.insert(step.order) {
            return Err(format!(
                "Step '{}': duplicate order {}",
                step.step_key, step.order
            ));
        }
        if step.is_terminal {
            terminal_count += 1;
            if terminal_count > 1 {
                return Err(format!(
                    "Step '{}': at most one step may be terminal",
                    step.step_key
                ));
            }
        }

        let strategy = ApproverStrategy::parse(step.approver_strategy)
            .map_err(|e| format!("Step '{}': {e}", step.step_key))?;
        parse_approver_value(strategy, step.approver_value)
            .map_err(|e| format!("Step '{}': {e}", step.step_key))?;

        validate_approval_mode(step.approval_mode)
            .map_err(|e| format!("Step '{}': {e}", step.step_key))?;

        let target_type = RejectTargetType::parse(step.reject_target_type)
            .map_err(|e| format!("Step '{}': {e}", step.step_key))?;
        if target_type == RejectTargetType::Specific {
            let target = step.reject_target_step_key.ok_or_else(|| {
                format!(
                    "Step '{}': reject_target_step_key is required when reject_target_type is SPECIFIC",
                    step.step_key
                )
            })?;
            if !steps.iter().any(|s| s.step_key == target) {
                return Err(format!(
                    "Step '{}': reject target '{}' does not reference a step in this workflow",
                    step.step_key, target
                ));
            }
        }
    }

    Ok(())
}
