use axum::{Json, debug_handler, extract::{Path, State}, http::StatusCode};
use serde::Deserialize;

use crate::{AppResult, members::{MemberDirectory, SqliteMemberDirectory}, model::Member};

#[derive(Deserialize)]
pub(crate) struct RegisterQuery {
    email: String,
    nickname: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(members): State<SqliteMemberDirectory>,
    Json(RegisterQuery { email, nickname }): Json<RegisterQuery>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = members.register_member(email.trim(), nickname.trim()).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    Path(email): Path<String>,
    State(members): State<SqliteMemberDirectory>,
) -> AppResult<Json<Member>> {
    Ok(Json(members.find_member_by_email(&email).await?))
}
