pub mod health;
pub mod image;
pub mod queue;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// POST /image/generate   run a create job synchronously
/// POST /image/edit       run an edit job synchronously
/// POST /test/queue       publish a job to the image queue
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/image", image::router())
        .nest("/test", queue::router())
}
