use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{ChatError, ChatResult},
    model::{Member, Message, MessageType, Room, from_nanos, to_nanos},
};

#[derive(FromRow)]
pub(crate) struct MessageRow {
    id: String,
    kind: String,
    nickname: String,
    email: String,
    room_code: String,
    body: String,
    created_at: i64,
}

impl MessageRow {
    pub(crate) fn into_message(self) -> ChatResult<Message> {
        Ok(Message {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| ChatError::Corrupt(format!("invalid message id: {e}")))?,
            kind: self.kind.parse()?,
            nickname: self.nickname,
            email: self.email,
            room_code: self.room_code,
            body: self.body,
            created_at: from_nanos(self.created_at)?,
        })
    }
}

/// Appends one immutable message row. `member.nickname` is what gets shown.
pub async fn record_message<'c>(
    exec: impl SqliteExecutor<'c>,
    kind: MessageType,
    member: &Member,
    room: &Room,
    body: &str,
) -> ChatResult<Message> {
    let message = Message {
        id: Uuid::now_v7(),
        kind,
        nickname: member.nickname.clone(),
        email: member.email.clone(),
        room_code: room.code.clone(),
        body: body.to_owned(),
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query(
        "INSERT INTO messages (id,room_code,kind,nickname,email,body,created_at) VALUES (?,?,?,?,?,?,?)",
    )
    .bind(message.id.to_string())
    .bind(&message.room_code)
    .bind(message.kind.as_str())
    .bind(&message.nickname)
    .bind(&message.email)
    .bind(&message.body)
    .bind(to_nanos(message.created_at))
    .execute(exec)
    .await?;

    Ok(message)
}

/// Full history of a room, oldest first.
pub async fn list_messages<'c>(exec: impl SqliteExecutor<'c>, room: &Room) -> ChatResult<Vec<Message>> {
    sqlx::query_as::<_, MessageRow>(
        "SELECT id,kind,nickname,email,room_code,body,created_at FROM messages
         WHERE room_code=? ORDER BY created_at, seq",
    )
    .bind(&room.code)
    .fetch_all(exec)
    .await?
    .into_iter()
    .map(MessageRow::into_message)
    .collect()
}
