//! Messages whose search-index copy has not been written yet.
//!
//! A row is inserted in the same transaction as its message and removed once the
//! index accepted the copy, so every committed message reaches the index at least once.

use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::ChatResult,
    model::{Message, to_nanos},
};

use super::messages::MessageRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIndexWrite {
    pub message: Message,
    pub attempts: u32,
}

#[derive(FromRow)]
struct PendingRow {
    #[sqlx(flatten)]
    message: MessageRow,
    attempts: i64,
}

pub async fn enqueue<'c>(exec: impl SqliteExecutor<'c>, message: &Message) -> ChatResult<()> {
    sqlx::query("INSERT INTO index_outbox (message_id,attempts,next_attempt_at) VALUES (?,0,?)")
        .bind(message.id.to_string())
        .bind(to_nanos(message.created_at))
        .execute(exec)
        .await?;
    Ok(())
}

/// Entries due at `now`, in commit order.
pub async fn due<'c>(
    exec: impl SqliteExecutor<'c>,
    now: OffsetDateTime,
    limit: i64,
) -> ChatResult<Vec<PendingIndexWrite>> {
    sqlx::query_as::<_, PendingRow>(
        "SELECT m.id,m.kind,m.nickname,m.email,m.room_code,m.body,m.created_at,o.attempts
         FROM index_outbox o JOIN messages m ON m.id=o.message_id
         WHERE o.next_attempt_at<=?
         ORDER BY m.seq
         LIMIT ?",
    )
    .bind(to_nanos(now))
    .bind(limit)
    .fetch_all(exec)
    .await?
    .into_iter()
    .map(|row| {
        Ok(PendingIndexWrite {
            message: row.message.into_message()?,
            attempts: row.attempts as u32,
        })
    })
    .collect()
}

pub async fn acknowledge<'c>(exec: impl SqliteExecutor<'c>, message_id: Uuid) -> ChatResult<()> {
    sqlx::query("DELETE FROM index_outbox WHERE message_id=?")
        .bind(message_id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn reschedule<'c>(
    exec: impl SqliteExecutor<'c>,
    message_id: Uuid,
    attempts: u32,
    next_attempt_at: OffsetDateTime,
    error: &str,
) -> ChatResult<()> {
    sqlx::query("UPDATE index_outbox SET attempts=?,next_attempt_at=?,last_error=? WHERE message_id=?")
        .bind(attempts as i64)
        .bind(to_nanos(next_attempt_at))
        .bind(error)
        .bind(message_id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn pending_count<'c>(exec: impl SqliteExecutor<'c>) -> ChatResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM index_outbox")
        .fetch_one(exec)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::testing,
        model::{Member, MessageType},
        store::{messages, rooms},
    };

    #[tokio::test]
    async fn rescheduled_entries_wait_their_turn() {
        let (_dir, primary, _index) = testing::stores().await;
        let mut conn = primary.acquire().await.unwrap();
        let room = rooms::create_room(&mut conn, "general").await.unwrap();
        let ann = Member {
            email: "a@x.com".to_owned(),
            nickname: "Ann".to_owned(),
        };
        let message = messages::record_message(&mut *conn, MessageType::Talk, &ann, &room, "hi")
            .await
            .unwrap();
        enqueue(&mut *conn, &message).await.unwrap();

        let now = OffsetDateTime::now_utc();
        let pending = due(&mut *conn, now, 10).await.unwrap();
        assert_eq!(pending, vec![PendingIndexWrite { message: message.clone(), attempts: 0 }]);

        let later = now + time::Duration::seconds(30);
        reschedule(&mut *conn, message.id, 1, later, "index down").await.unwrap();
        assert!(due(&mut *conn, now, 10).await.unwrap().is_empty());
        assert_eq!(due(&mut *conn, later, 10).await.unwrap()[0].attempts, 1);

        acknowledge(&mut *conn, message.id).await.unwrap();
        assert_eq!(pending_count(&mut *conn).await.unwrap(), 0);
    }
}
