use axum::{http::StatusCode, response::{IntoResponse, Response}};
use tracing::error;

use crate::{error::ChatError, session::NotLoggedIn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        if self.0.is::<NotLoggedIn>() {
            return StatusCode::UNAUTHORIZED;
        }

        match self.0.downcast_ref::<ChatError>() {
            Some(ChatError::RoomNotFound(_) | ChatError::MemberNotFound(_) | ChatError::NoMembership(_)) => {
                StatusCode::NOT_FOUND
            }
            Some(ChatError::SessionAttach) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, backtrace = %self.0.backtrace(), "request failed");
        }

        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
