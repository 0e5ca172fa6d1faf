use axum::{Json, debug_handler, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, members::{MemberDirectory, SqliteMemberDirectory}, model::Member, session::EMAIL};

#[derive(Deserialize)]
pub struct LoginQuery {
    pub email: String,
}

/// Binds a known member to the cookie session.
#[debug_handler(state = crate::AppState)]
pub async fn login(
    State(members): State<SqliteMemberDirectory>,
    session: Session,
    Json(LoginQuery { email }): Json<LoginQuery>,
) -> AppResult<Json<Member>> {
    let member = members.find_member_by_email(&email).await?;

    session.cycle_id().await?;
    session.insert(EMAIL, &member.email).await?;

    info!(email = %member.email, "logged in");
    Ok(Json(member))
}
