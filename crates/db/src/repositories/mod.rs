//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (single-statement reads/writes) or an open `DbTx`
//! (writes that are part of an engine transition) as the first argument.

pub mod action_log_repo;
pub mod instance_repo;
pub mod role_repo;
pub mod step_def_repo;
pub mod step_instance_repo;
pub mod user_repo;
pub mod workflow_def_repo;

pub use action_log_repo::ActionLogRepo;
pub use instance_repo::InstanceRepo;
pub use role_repo::RoleRepo;
pub use step_def_repo::StepDefRepo;
pub use step_instance_repo::StepInstanceRepo;
pub use user_repo::UserRepo;
pub use workflow_def_repo::WorkflowDefRepo;
