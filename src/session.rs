//! Keys and helpers for the HTTP cookie session.

use thiserror::Error;
use tower_sessions::Session;

use crate::AppResult;

pub const EMAIL: &str = "email";

#[derive(Debug, Error)]
#[error("log in first")]
pub struct NotLoggedIn;

/// Email bound to this browser session by `/login`.
pub async fn current_email(session: &Session) -> AppResult<String> {
    match session.get::<String>(EMAIL).await? {
        Some(email) => Ok(email),
        None => Err(NotLoggedIn.into()),
    }
}
