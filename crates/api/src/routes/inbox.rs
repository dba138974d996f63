//! Route definitions for the `/inbox` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::inbox;
use crate::state::AppState;

/// Routes mounted at `/inbox`.
///
/// ```text
/// GET / -> caller's pending work (default) or history (?mode=history)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(inbox::list_inbox))
}
