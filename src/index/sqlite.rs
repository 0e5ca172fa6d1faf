use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::MessageIndex;
use crate::{
    error::IndexError,
    model::{IndexEntry, MessageType, Page, SearchResult, to_nanos},
};

/// Shortest term the trigram tokenizer can look up.
const TRIGRAM: usize = 3;

/// FTS5 trigram index living in its own database.
#[derive(Clone)]
pub struct SqliteMessageIndex {
    db_pool: SqlitePool,
}

impl SqliteMessageIndex {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

/// How free text is looked up. Any word may match, and a word matches anywhere
/// inside the body, so "날씨" finds "날씨가".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextQuery {
    /// Every word is long enough for the trigram index: an FTS5 expression,
    /// ranked by relevance.
    Match(String),
    /// Some word is shorter than a trigram: `LIKE` patterns, newest first.
    Like(Vec<String>),
}

/// Splits free text into words and picks the lookup for them.
/// Returns `None` when the text has no searchable words.
pub fn text_query(text: &str) -> Option<TextQuery> {
    // only alphanumeric runs survive, so no FTS5 syntax or LIKE wildcard gets through
    let terms: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .collect();

    if terms.is_empty() {
        return None;
    }
    if terms.iter().all(|term| term.chars().count() >= TRIGRAM) {
        let quoted: Vec<String> = terms.iter().map(|term| format!("\"{term}\"")).collect();
        Some(TextQuery::Match(quoted.join(" OR ")))
    } else {
        Some(TextQuery::Like(terms.iter().map(|term| format!("%{term}%")).collect()))
    }
}

#[derive(FromRow)]
struct HitRow {
    message_id: String,
    kind: String,
    nickname: String,
    email: String,
    room_code: String,
    message: String,
    created_at: i64,
}

impl HitRow {
    fn into_result(self) -> Result<SearchResult, IndexError> {
        let corrupt = |e: String| IndexError::Corrupt(e);
        Ok(SearchResult {
            message_id: Uuid::parse_str(&self.message_id).map_err(|e| corrupt(e.to_string()))?,
            kind: self.kind.parse::<MessageType>().map_err(|e| corrupt(e.to_string()))?,
            nickname: self.nickname,
            email: self.email,
            room_code: self.room_code,
            message: self.message,
            created_at: OffsetDateTime::from_unix_timestamp_nanos(self.created_at as i128)
                .map_err(|e| corrupt(e.to_string()))?,
        })
    }
}

#[async_trait]
impl MessageIndex for SqliteMessageIndex {
    async fn index_message(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        let message_id = entry.message_id.to_string();
        let mut tx = self.db_pool.begin().await?;

        sqlx::query("DELETE FROM message_index WHERE message_id=?")
            .bind(&message_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO message_index (message,message_id,kind,nickname,email,room_code,created_at)
             VALUES (?,?,?,?,?,?,?)",
        )
        .bind(&entry.message)
        .bind(&message_id)
        .bind(entry.kind.as_str())
        .bind(&entry.nickname)
        .bind(&entry.email)
        .bind(&entry.room_code)
        .bind(to_nanos(entry.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(%message_id, room_code = %entry.room_code, "message indexed");
        Ok(())
    }

    async fn search(&self, room_code: &str, text: &str, page: Page) -> Result<Vec<SearchResult>, IndexError> {
        let Some(lookup) = text_query(text) else {
            return Ok(Vec::new());
        };

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT message_id,kind,nickname,email,room_code,message,
                    CAST(created_at AS INTEGER) AS created_at
             FROM message_index
             WHERE room_code=",
        );
        query.push_bind(room_code);

        match lookup {
            TextQuery::Match(expression) => {
                query.push(" AND message_index MATCH ").push_bind(expression);
                query.push(" ORDER BY rank");
            }
            TextQuery::Like(patterns) => {
                query.push(" AND (");
                {
                    let mut any = query.separated(" OR ");
                    for pattern in patterns {
                        any.push("message LIKE ").push_bind_unseparated(pattern);
                    }
                }
                query.push(") ORDER BY CAST(created_at AS INTEGER) DESC");
            }
        }
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());

        query
            .build_query_as::<HitRow>()
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(HitRow::into_result)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    fn entry(room_code: &str, message: &str) -> IndexEntry {
        IndexEntry {
            message_id: Uuid::now_v7(),
            kind: MessageType::Talk,
            nickname: "Ann".to_owned(),
            email: "a@x.com".to_owned(),
            room_code: room_code.to_owned(),
            message: message.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn long_words_become_a_match_expression() {
        assert_eq!(
            text_query("hello there"),
            Some(TextQuery::Match("\"hello\" OR \"there\"".to_owned()))
        );
        assert_eq!(
            text_query("\"NEAR(abc\" *"),
            Some(TextQuery::Match("\"NEAR\" OR \"abc\"".to_owned()))
        );
        assert_eq!(text_query("  ?! "), None);
    }

    #[test]
    fn short_words_fall_back_to_like() {
        assert_eq!(
            text_query("hi there"),
            Some(TextQuery::Like(vec!["%hi%".to_owned(), "%there%".to_owned()]))
        );
        assert_eq!(
            text_query("안녕 하세요"),
            Some(TextQuery::Like(vec!["%안녕%".to_owned(), "%하세요%".to_owned()]))
        );
        assert_eq!(text_query("100%_"), Some(TextQuery::Match("\"100\"".to_owned())));
    }

    #[tokio::test]
    async fn search_is_scoped_to_room() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);

        let mine = entry("C1", "hi everyone");
        index.index_message(&mine).await.unwrap();
        index.index_message(&entry("C2", "hi from elsewhere")).await.unwrap();
        index.index_message(&entry("C1", "good morning")).await.unwrap();

        let hits = index.search("C1", "hi", Page::default()).await.unwrap();
        assert_eq!(hits, vec![mine]);
    }

    #[tokio::test]
    async fn reindexing_replaces_entry() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);

        let hello = entry("C1", "hello");
        index.index_message(&hello).await.unwrap();
        index.index_message(&hello).await.unwrap();

        let hits = index.search("C1", "hello", Page::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn nothing_matching_is_empty() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);
        index.index_message(&entry("C1", "hello")).await.unwrap();

        assert!(index.search("C1", "goodbye", Page::default()).await.unwrap().is_empty());
        assert!(index.search("C1", "", Page::default()).await.unwrap().is_empty());
        assert!(index.search("C9", "hello", Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_through_hits() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);
        for n in 0..5 {
            index.index_message(&entry("C1", &format!("ping {n}"))).await.unwrap();
        }

        let first = index.search("C1", "ping", Page { page: 0, size: 2 }).await.unwrap();
        let last = index.search("C1", "ping", Page { page: 2, size: 2 }).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(last.len(), 1);
    }

    #[tokio::test]
    async fn finds_words_inside_longer_words() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);

        let weather = entry("C1", "오늘 날씨가 좋다");
        let mut greeting = entry("C1", "Ann님 입장!! ο(=•ω＜=)ρ⌒☆");
        greeting.kind = MessageType::Enter;
        index.index_message(&weather).await.unwrap();
        index.index_message(&greeting).await.unwrap();
        index.index_message(&entry("C1", "비가 온다")).await.unwrap();

        // two characters, below a trigram
        assert_eq!(index.search("C1", "날씨", Page::default()).await.unwrap(), vec![weather.clone()]);
        assert_eq!(index.search("C1", "날씨가", Page::default()).await.unwrap(), vec![weather]);
        assert_eq!(index.search("C1", "Ann", Page::default()).await.unwrap(), vec![greeting.clone()]);
        assert_eq!(index.search("C1", "ann", Page::default()).await.unwrap(), vec![greeting.clone()]);
        assert_eq!(index.search("C1", "입장", Page::default()).await.unwrap(), vec![greeting]);
        assert!(index.search("C1", "weather", Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_length_words_match_any() {
        let (_dir, _primary, index) = testing::stores().await;
        let index = SqliteMessageIndex::new(index);
        index.index_message(&entry("C1", "Ann님 입장!!")).await.unwrap();
        index.index_message(&entry("C1", "비가 온다")).await.unwrap();
        index.index_message(&entry("C1", "hello")).await.unwrap();

        let hits = index.search("C1", "Ann 비", Page::default()).await.unwrap();
        let mut bodies: Vec<&str> = hits.iter().map(|hit| hit.message.as_str()).collect();
        bodies.sort();
        assert_eq!(bodies, ["Ann님 입장!!", "비가 온다"]);
    }
}
