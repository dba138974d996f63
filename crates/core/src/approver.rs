//! Approver-value parsing and the dynamic-resolver registry.
//!
//! Each step definition carries an `approver_value` payload whose grammar
//! depends on the step's strategy. Parsing is separated from resolution so
//! malformed payloads are caught both at definition time (step validation)
//! and again at transition time, before any row is written.

use crate::types::DbId;
use crate::workflow::{ApproverStrategy, SUBMITTER_TOKEN};

/// A parsed `approver_value` payload, ready for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproverSpec {
    /// The instance submitter (the `SUBMITTER` token).
    Submitter,
    /// An explicit list of user ids.
    Users(Vec<DbId>),
    /// All members of the named role.
    Role(String),
    /// A key into [`DYNAMIC_REGISTRY`].
    Dynamic(String),
    /// Union of independently resolved sub-entries (never nested).
    Multi(Vec<ApproverSpec>),
}

/// One entry in the dynamic-resolver registry.
///
/// `metadata_field: Some(f)` means the resolver reads field `f` from the
/// most recent action-log entry's metadata; `None` means it resolves from
/// the entry itself (e.g. its actor). Keeping the required field in the
/// registry lets missing-context failures be reported by name instead of
/// via unchecked lookups.
#[derive(Debug, Clone, Copy)]
pub struct DynamicResolver {
    pub key: &'static str,
    pub metadata_field: Option<&'static str>,
}

/// The actor of the most recent action-log entry for the instance.
pub const DYNAMIC_PREVIOUS_ACTOR: &str = "PREVIOUS_ACTOR";

/// The user recorded under `metadata.selected_pic` by the previous action.
pub const DYNAMIC_SELECTED_PIC: &str = "SELECTED_PIC";

/// All registered dynamic resolver keys. Fixed at compile time; step
/// validation rejects any key not listed here.
pub const DYNAMIC_REGISTRY: &[DynamicResolver] = &[
    DynamicResolver {
        key: DYNAMIC_PREVIOUS_ACTOR,
        metadata_field: None,
    },
    DynamicResolver {
        key: DYNAMIC_SELECTED_PIC,
        metadata_field: Some("selected_pic"),
    },
];

/// Look up a dynamic resolver by key.
pub fn dynamic_resolver(key: &str) -> Option<&'static DynamicResolver> {
    DYNAMIC_REGISTRY.iter().find(|r| r.key == key)
}

/// Parse an `approver_value` payload for the given strategy.
///
/// Returns a human-readable error naming the offending entry on failure.
pub fn parse_approver_value(
    strategy: ApproverStrategy,
    value: &str,
) -> Result<ApproverSpec, String> {
    let value = value.trim();
    match strategy {
        ApproverStrategy::User => parse_user_value(value),
        ApproverStrategy::Role => {
            if value.is_empty() {
                Err("ROLE approver value must be a non-empty role name".to_string())
            } else {
                Ok(ApproverSpec::Role(value.to_string()))
            }
        }
        ApproverStrategy::Dynamic => {
            if dynamic_resolver(value).is_some() {
                Ok(ApproverSpec::Dynamic(value.to_string()))
            } else {
                Err(format!("Unknown dynamic resolver key '{value}'"))
            }
        }
        ApproverStrategy::Multi => parse_multi_value(value),
    }
}

/// USER payloads: the `SUBMITTER` token, a JSON array of ids, or one id.
fn parse_user_value(value: &str) -> Result<ApproverSpec, String> {
    if value == SUBMITTER_TOKEN {
        return Ok(ApproverSpec::Submitter);
    }
    if value.starts_with('[') {
        let ids: Vec<DbId> = serde_json::from_str(value)
            .map_err(|e| format!("USER approver value is not a valid id array: {e}"))?;
        if ids.is_empty() {
            return Err("USER approver id array must not be empty".to_string());
        }
        return Ok(ApproverSpec::Users(ids));
    }
    let id: DbId = value
        .parse()
        .map_err(|_| format!("USER approver value '{value}' is not a user id"))?;
    Ok(ApproverSpec::Users(vec![id]))
}

/// MULTI payloads: comma-separated `TYPE:value` entries. Nested MULTI is
/// rejected; each sub-entry must itself parse under its own strategy.
fn parse_multi_value(value: &str) -> Result<ApproverSpec, String> {
    let mut parts = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err("MULTI approver value contains an empty entry".to_string());
        }
        let (type_str, sub_value) = entry
            .split_once(':')
            .ok_or_else(|| format!("MULTI entry '{entry}' is not of the form TYPE:value"))?;
        let sub_strategy = ApproverStrategy::parse(type_str.trim())
            .map_err(|e| format!("MULTI entry '{entry}': {e}"))?;
        if sub_strategy == ApproverStrategy::Multi {
            return Err(format!("MULTI entry '{entry}' must not nest MULTI"));
        }
        let spec = parse_approver_value(sub_strategy, sub_value)
            .map_err(|e| format!("MULTI entry '{entry}': {e}"))?;
        parts.push(spec);
    }
    if parts.is_empty() {
        return Err("MULTI approver value must contain at least one entry".to_string());
    }
    Ok(ApproverSpec::Multi(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_submitter_token() {
        let spec = parse_approver_value(ApproverStrategy::User, "SUBMITTER").unwrap();
        assert_eq!(spec, ApproverSpec::Submitter);
    }

    #[test]
    fn test_user_single_id() {
        let spec = parse_approver_value(ApproverStrategy::User, "42").unwrap();
        assert_eq!(spec, ApproverSpec::Users(vec![42]));
    }

    #[test]
    fn test_user_id_array() {
        let spec = parse_approver_value(ApproverStrategy::User, "[1, 2, 3]").unwrap();
        assert_eq!(spec, ApproverSpec::Users(vec![1, 2, 3]));
    }

    #[test]
    fn test_user_garbage_rejected() {
        assert!(parse_approver_value(ApproverStrategy::User, "alice").is_err());
        assert!(parse_approver_value(ApproverStrategy::User, "[]").is_err());
        assert!(parse_approver_value(ApproverStrategy::User, "[1, \"x\"]").is_err());
    }

    #[test]
    fn test_role_name() {
        let spec = parse_approver_value(ApproverStrategy::Role, "manager").unwrap();
        assert_eq!(spec, ApproverSpec::Role("manager".to_string()));
        assert!(parse_approver_value(ApproverStrategy::Role, "  ").is_err());
    }

    #[test]
    fn test_dynamic_known_keys() {
        for key in [DYNAMIC_PREVIOUS_ACTOR, DYNAMIC_SELECTED_PIC] {
            let spec = parse_approver_value(ApproverStrategy::Dynamic, key).unwrap();
            assert_eq!(spec, ApproverSpec::Dynamic(key.to_string()));
        }
    }

    #[test]
    fn test_dynamic_unknown_key_rejected() {
        let result = parse_approver_value(ApproverStrategy::Dynamic, "MOON_PHASE");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Unknown dynamic resolver key"));
    }

    #[test]
    fn test_multi_union_entries() {
        let spec =
            parse_approver_value(ApproverStrategy::Multi, "USER:7, ROLE:hr, DYNAMIC:SELECTED_PIC")
                .unwrap();
        assert_eq!(
            spec,
            ApproverSpec::Multi(vec![
                ApproverSpec::Users(vec![7]),
                ApproverSpec::Role("hr".to_string()),
                ApproverSpec::Dynamic("SELECTED_PIC".to_string()),
            ])
        );
    }

    #[test]
    fn test_multi_malformed_entry_rejected() {
        // Missing colon separator.
        assert!(parse_approver_value(ApproverStrategy::Multi, "USER 7").is_err());
        // Unknown sub-type.
        assert!(parse_approver_value(ApproverStrategy::Multi, "GROUP:7").is_err());
        // Nested MULTI.
        assert!(parse_approver_value(ApproverStrategy::Multi, "MULTI:USER:7").is_err());
        // Empty entry between commas.
        assert!(parse_approver_value(ApproverStrategy::Multi, "USER:7,,ROLE:hr").is_err());
    }

    #[test]
    fn test_registry_lookup() {
        assert!(dynamic_resolver("PREVIOUS_ACTOR").is_some());
        assert_eq!(
            dynamic_resolver("SELECTED_PIC").unwrap().metadata_field,
            Some("selected_pic")
        );
        assert!(dynamic_resolver("nope").is_none());
    }
}
