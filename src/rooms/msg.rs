use std::sync::Arc;

use axum::{Json, debug_handler, extract::{Path, Query, State}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    AppResult,
    chat::ChatService,
    model::{ChatPayload, Page, SearchResult},
    session::current_email,
};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    message: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(chat): State<Arc<ChatService>>,
    session: Session,
    Path(code): Path<String>,
) -> AppResult<Json<Vec<ChatPayload>>> {
    current_email(&session).await?;
    Ok(Json(chat.search_chat_list(&code).await?))
}

/// `?message=...&page=0&size=20`
#[debug_handler(state = crate::AppState)]
pub(crate) async fn search(
    State(chat): State<Arc<ChatService>>,
    session: Session,
    Path(code): Path<String>,
    Query(SearchQuery { message }): Query<SearchQuery>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<SearchResult>>> {
    current_email(&session).await?;
    Ok(Json(chat.search_messages(&code, &message, page).await?))
}
