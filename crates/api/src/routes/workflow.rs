//! Route definitions for the `/workflows` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::definition;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET  /                 -> list definitions (all versions)
/// POST /                 -> create definition (version 1, inactive)
/// GET  /{id}             -> definition with ordered steps
/// PUT  /{id}/steps       -> replace step list (inactive only)
/// POST /{id}/activate    -> activate (one active version per code)
/// POST /{id}/deactivate  -> deactivate
/// POST /{id}/versions    -> clone as next version (inactive)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(definition::list_workflows).post(definition::create_workflow),
        )
        .route("/{id}", get(definition::get_workflow))
        .route("/{id}/steps", put(definition::replace_steps))
        .route("/{id}/activate", post(definition::activate_workflow))
        .route("/{id}/deactivate", post(definition::deactivate_workflow))
        .route("/{id}/versions", post(definition::new_version))
}
