//! Greenlight domain layer.
//!
//! Pure types and logic shared by the DB and API crates: id/timestamp
//! aliases, the domain error taxonomy, the workflow vocabulary (statuses,
//! actions, approver strategies), approver-value parsing, and step-list
//! validation. This crate has no database or HTTP dependencies.

pub mod approver;
pub mod error;
pub mod steps;
pub mod types;
pub mod workflow;
