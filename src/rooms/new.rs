use std::sync::Arc;

use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{AppResult, chat::ChatService, model::Room, session::current_email};

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomQuery {
    name: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_room(
    State(chat): State<Arc<ChatService>>,
    session: Session,
    Json(NewRoomQuery { name }): Json<NewRoomQuery>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let email = current_email(&session).await?;
    let room = chat.make_room(name.trim(), &email).await?;
    Ok((StatusCode::CREATED, Json(room)))
}
