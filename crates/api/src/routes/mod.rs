pub mod auth;
pub mod health;
pub mod inbox;
pub mod instance;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/me                             current user (requires auth)
///
/// /workflows                           list, create definitions
/// /workflows/{id}                      definition with steps (GET)
/// /workflows/{id}/steps                replace step list (PUT)
/// /workflows/{id}/activate             activate (POST)
/// /workflows/{id}/deactivate           deactivate (POST)
/// /workflows/{id}/versions             clone as new version (POST)
///
/// /instances                           start an instance (POST)
/// /instances/{id}                      instance with step history (GET)
/// /instances/{id}/log                  action log (GET)
///
/// /step-instances/{id}/approve         approve pending step (POST)
/// /step-instances/{id}/send-back       send pending step back (POST)
///
/// /inbox                               pending work / history (?mode=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication (login is the only public endpoint).
        .nest("/auth", auth::router())
        // Workflow definition management.
        .nest("/workflows", workflow::router())
        // Instance lifecycle and inspection.
        .nest("/instances", instance::instances_router())
        // Transitions on pending step instances.
        .nest("/step-instances", instance::step_instances_router())
        // Per-user pending work and history.
        .nest("/inbox", inbox::router())
}
