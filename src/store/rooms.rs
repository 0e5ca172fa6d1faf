use rand::{Rng, distr::Alphanumeric};
use sqlx::{SqliteConnection, SqliteExecutor};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{ChatError, ChatResult},
    model::{Room, from_nanos, to_nanos},
};

pub const ROOM_CODE_LEN: usize = 8;
const CODE_ATTEMPTS: usize = 4;

pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Persists a new room under a fresh code. Membership is left to the caller.
pub async fn create_room(conn: &mut SqliteConnection, name: &str) -> ChatResult<Room> {
    let created_at = OffsetDateTime::now_utc();

    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code();
        let result = sqlx::query("INSERT INTO rooms (id,code,name,created_at) VALUES (?,?,?,?)")
            .bind(Uuid::now_v7().to_string())
            .bind(&code)
            .bind(name)
            .bind(to_nanos(created_at))
            .execute(&mut *conn)
            .await;

        match result {
            Ok(_) => {
                debug!(%code, %name, "room created");
                return Ok(Room {
                    code,
                    name: name.to_owned(),
                    created_at,
                });
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!(%code, "room code collision, drawing another");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ChatError::Corrupt("could not draw a free room code".to_owned()))
}

pub async fn resolve_room<'c>(exec: impl SqliteExecutor<'c>, code: &str) -> ChatResult<Room> {
    let row: Option<(String, String, i64)> =
        sqlx::query_as("SELECT code,name,created_at FROM rooms WHERE code=?")
            .bind(code)
            .fetch_optional(exec)
            .await?;

    let Some((code, name, created_at)) = row else {
        return Err(ChatError::RoomNotFound(code.to_owned()));
    };

    Ok(Room {
        code,
        name,
        created_at: from_nanos(created_at)?,
    })
}
