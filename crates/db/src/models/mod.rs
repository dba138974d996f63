//! Entity models and DTOs.

pub mod action_log;
pub mod instance;
pub mod role;
pub mod user;
pub mod workflow;
