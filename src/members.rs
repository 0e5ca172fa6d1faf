use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    error::{ChatError, ChatResult},
    model::{Member, to_nanos},
};

/// Identity lookup. Chat only ever asks "who owns this email".
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_member_by_email(&self, email: &str) -> ChatResult<Member>;
}

#[derive(Clone)]
pub struct SqliteMemberDirectory {
    db_pool: SqlitePool,
}

impl SqliteMemberDirectory {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Signs a member up, or renames them if the email is already known.
    pub async fn register_member(&self, email: &str, nickname: &str) -> ChatResult<Member> {
        sqlx::query(
            "INSERT INTO members (email,nickname,created_at) VALUES (?,?,?)
             ON CONFLICT(email) DO UPDATE SET nickname=excluded.nickname",
        )
        .bind(email)
        .bind(nickname)
        .bind(to_nanos(OffsetDateTime::now_utc()))
        .execute(&self.db_pool)
        .await?;

        info!(%email, %nickname, "member registered");
        Ok(Member {
            email: email.to_owned(),
            nickname: nickname.to_owned(),
        })
    }
}

#[async_trait]
impl MemberDirectory for SqliteMemberDirectory {
    async fn find_member_by_email(&self, email: &str) -> ChatResult<Member> {
        let row: Option<(String, String)> = sqlx::query_as("SELECT email,nickname FROM members WHERE email=?")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;

        let (email, nickname) = row.ok_or_else(|| ChatError::MemberNotFound(email.to_owned()))?;
        Ok(Member { email, nickname })
    }
}
