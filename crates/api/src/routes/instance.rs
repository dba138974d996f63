//! Route definitions for the `/instances` and `/step-instances` resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::instance;
use crate::state::AppState;

/// Routes mounted at `/instances`.
///
/// ```text
/// POST /          -> start an instance
/// GET  /{id}      -> instance with full step history
/// GET  /{id}/log  -> append-only action log
/// ```
pub fn instances_router() -> Router<AppState> {
    Router::new()
        .route("/", post(instance::start_instance))
        .route("/{id}", get(instance::get_instance))
        .route("/{id}/log", get(instance::get_action_log))
}

/// Routes mounted at `/step-instances`.
///
/// ```text
/// POST /{id}/approve    -> approve a pending step
/// POST /{id}/send-back  -> send a pending step back
/// ```
pub fn step_instances_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/approve", post(instance::approve_step))
        .route("/{id}/send-back", post(instance::send_back_step))
}
