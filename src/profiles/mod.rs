mod page;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(page::register))
        .route("/{email}", get(page::profile))
}
