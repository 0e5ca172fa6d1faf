use thiserror::Error;

/// Terminal failures of a single inbound chat event.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("member '{0}' not found")]
    MemberNotFound(String),

    #[error("member '{0}' has not joined any room")]
    NoMembership(String),

    /// The connection's session is gone, so identity can't be attached to it.
    #[error("socket session is no longer attached")]
    SessionAttach,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Failures of the secondary search store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("index unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt index entry: {0}")]
    Corrupt(String),
}
