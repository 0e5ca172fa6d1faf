mod msg;
mod new;
mod room;
mod ws;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(room::my_rooms).post(new::new_room))
        .route("/ws", get(ws::chat_ws))
        .route("/{code}/join", post(room::join_room))
        .route("/{code}/messages", get(msg::messages))
        .route("/{code}/search", get(msg::search))
}
