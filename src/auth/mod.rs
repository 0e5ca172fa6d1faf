mod login;
mod logout;

use axum::{Router, routing::post};

use crate::AppState;

pub use login::login;
pub use logout::logout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
