//! Workflow vocabulary: statuses, log actions, and step configuration enums.
//!
//! Status and action values are stored as plain text columns; the constants
//! here are the single source of truth for the accepted values. The step
//! configuration fields (`approver_strategy`, `reject_target_type`,
//! `approval_mode`) are closed sets, modelled as enums with explicit
//! `parse`/`as_str` conversions so dispatch is exhaustive.

/// Workflow instance statuses.
pub const INSTANCE_IN_PROGRESS: &str = "IN_PROGRESS";
pub const INSTANCE_APPROVED: &str = "APPROVED";
pub const INSTANCE_REJECTED: &str = "REJECTED";

/// Step instance statuses.
pub const STEP_PENDING: &str = "PENDING";
pub const STEP_APPROVED: &str = "APPROVED";
pub const STEP_REJECTED: &str = "REJECTED";

/// Action log entry types.
pub const ACTION_SUBMIT: &str = "SUBMIT";
pub const ACTION_APPROVE: &str = "APPROVE";
pub const ACTION_SEND_BACK: &str = "SEND_BACK";

/// Literal `approver_value` token that resolves to the instance submitter.
pub const SUBMITTER_TOKEN: &str = "SUBMITTER";

/// How a step's approver set is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproverStrategy {
    /// A literal user id, a JSON array of user ids, or the `SUBMITTER` token.
    User,
    /// All active users currently holding the named role.
    Role,
    /// A key in the dynamic-resolver registry (see [`crate::approver`]).
    Dynamic,
    /// A comma-separated list of `TYPE:value` sub-entries, resolved as a union.
    Multi,
}

impl ApproverStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApproverStrategy::User => "USER",
            ApproverStrategy::Role => "ROLE",
            ApproverStrategy::Dynamic => "DYNAMIC",
            ApproverStrategy::Multi => "MULTI",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "USER" => Ok(ApproverStrategy::User),
            "ROLE" => Ok(ApproverStrategy::Role),
            "DYNAMIC" => Ok(ApproverStrategy::Dynamic),
            "MULTI" => Ok(ApproverStrategy::Multi),
            other => Err(format!(
                "Invalid approver strategy '{other}'. Must be one of: USER, ROLE, DYNAMIC, MULTI"
            )),
        }
    }
}

/// Where a send-back routes control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectTargetType {
    /// The step immediately preceding the current one by order.
    Previous,
    /// The step identified by `reject_target_step_id`.
    Specific,
}

impl RejectTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectTargetType::Previous => "PREVIOUS",
            RejectTargetType::Specific => "SPECIFIC",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "PREVIOUS" => Ok(RejectTargetType::Previous),
            "SPECIFIC" => Ok(RejectTargetType::Specific),
            other => Err(format!(
                "Invalid reject target type '{other}'. Must be one of: PREVIOUS, SPECIFIC"
            )),
        }
    }
}

/// The only supported approval mode. The engine advances on the first
/// action from any assigned approver; a "require all assignees" mode is
/// deliberately not configurable (rejected at step validation time).
pub const APPROVAL_MODE_ANY: &str = "ANY";

/// Validate an `approval_mode` value.
pub fn validate_approval_mode(mode: &str) -> Result<(), String> {
    if mode == APPROVAL_MODE_ANY {
        Ok(())
    } else {
        Err(format!(
            "Unsupported approval mode '{mode}'. Only '{APPROVAL_MODE_ANY}' is supported"
        ))
    }
}
