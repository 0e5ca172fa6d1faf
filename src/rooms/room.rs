use std::sync::Arc;

use axum::{Json, debug_handler, extract::{Path, State}};
use tower_sessions::Session;

use crate::{AppResult, chat::ChatService, model::Room, session::current_email};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn my_rooms(
    State(chat): State<Arc<ChatService>>,
    session: Session,
) -> AppResult<Json<Vec<Room>>> {
    let email = current_email(&session).await?;
    Ok(Json(chat.search_room_list(&email).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn join_room(
    State(chat): State<Arc<ChatService>>,
    session: Session,
    Path(code): Path<String>,
) -> AppResult<Json<Room>> {
    let email = current_email(&session).await?;
    Ok(Json(chat.register_room(&code, &email).await?))
}
