use sqlx::SqliteExecutor;
use time::OffsetDateTime;

use crate::{
    error::{ChatError, ChatResult},
    model::{Member, Membership, Room, from_nanos, to_nanos},
};

/// Records that `member` belongs to `room`. Calling it twice records two rows.
pub async fn create_membership<'c>(
    exec: impl SqliteExecutor<'c>,
    room: &Room,
    member: &Member,
) -> ChatResult<Membership> {
    let created_at = OffsetDateTime::now_utc();
    sqlx::query("INSERT INTO memberships (room_code,email,created_at) VALUES (?,?,?)")
        .bind(&room.code)
        .bind(&member.email)
        .bind(to_nanos(created_at))
        .execute(exec)
        .await?;

    Ok(Membership {
        room_code: room.code.clone(),
        email: member.email.clone(),
        created_at,
    })
}

/// Every room the member joined. Having none is an error, not an empty list.
pub async fn list_rooms_for_member<'c>(
    exec: impl SqliteExecutor<'c>,
    member: &Member,
) -> ChatResult<Vec<Room>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT DISTINCT r.code,r.name,r.created_at FROM memberships m
         JOIN rooms r ON r.code=m.room_code
         WHERE m.email=?",
    )
    .bind(&member.email)
    .fetch_all(exec)
    .await?;

    if rows.is_empty() {
        return Err(ChatError::NoMembership(member.email.clone()));
    }

    rows.into_iter()
        .map(|(code, name, created_at)| {
            Ok(Room {
                code,
                name,
                created_at: from_nanos(created_at)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::testing, store::rooms};

    fn ann() -> Member {
        Member {
            email: "a@x.com".to_owned(),
            nickname: "Ann".to_owned(),
        }
    }

    #[tokio::test]
    async fn joining_twice_records_two_rows() {
        let (_dir, primary, _index) = testing::stores().await;
        let mut conn = primary.acquire().await.unwrap();
        let room = rooms::create_room(&mut conn, "general").await.unwrap();

        create_membership(&mut *conn, &room, &ann()).await.unwrap();
        create_membership(&mut *conn, &room, &ann()).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT count(*) FROM memberships WHERE room_code=? AND email=?")
                .bind(&room.code)
                .bind("a@x.com")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(count, 2);

        // the room still shows up once
        let listed = list_rooms_for_member(&mut *conn, &ann()).await.unwrap();
        assert_eq!(listed, vec![room]);
    }

    #[tokio::test]
    async fn lists_every_joined_room() {
        let (_dir, primary, _index) = testing::stores().await;
        let mut conn = primary.acquire().await.unwrap();
        let general = rooms::create_room(&mut conn, "general").await.unwrap();
        let random = rooms::create_room(&mut conn, "random").await.unwrap();
        rooms::create_room(&mut conn, "elsewhere").await.unwrap();

        create_membership(&mut *conn, &general, &ann()).await.unwrap();
        create_membership(&mut *conn, &random, &ann()).await.unwrap();

        let mut codes: Vec<String> = list_rooms_for_member(&mut *conn, &ann())
            .await
            .unwrap()
            .into_iter()
            .map(|room| room.code)
            .collect();
        codes.sort();
        let mut expected = vec![general.code, random.code];
        expected.sort();
        assert_eq!(codes, expected);
    }

    #[tokio::test]
    async fn no_rooms_is_no_membership() {
        let (_dir, primary, _index) = testing::stores().await;

        let err = list_rooms_for_member(&primary, &ann()).await.unwrap_err();
        assert!(matches!(err, ChatError::NoMembership(email) if email == "a@x.com"));
    }
}
