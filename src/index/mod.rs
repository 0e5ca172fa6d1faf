//! Secondary search store. It holds a copy of every message and is only ever
//! used for text search; full history always comes from the primary store.

mod relay;
mod sqlite;

pub use relay::{DrainReport, IndexRelay};
pub use sqlite::{SqliteMessageIndex, TextQuery, text_query};

use async_trait::async_trait;

use crate::{
    error::IndexError,
    model::{IndexEntry, Page, SearchResult},
};

#[async_trait]
pub trait MessageIndex: Send + Sync {
    /// Stores `entry` under its message id, replacing any earlier copy.
    async fn index_message(&self, entry: &IndexEntry) -> Result<(), IndexError>;

    /// Entries of `room_code` whose body contains any word of `text`.
    async fn search(&self, room_code: &str, text: &str, page: Page) -> Result<Vec<SearchResult>, IndexError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{MessageIndex, SqliteMessageIndex};
    use crate::{
        error::IndexError,
        model::{IndexEntry, Page, SearchResult},
    };

    /// Wraps the real index with a switch that makes writes fail.
    pub(crate) struct FlakyIndex {
        pub(crate) inner: SqliteMessageIndex,
        pub(crate) down: AtomicBool,
        pub(crate) writes: AtomicUsize,
    }

    impl FlakyIndex {
        pub(crate) fn new(inner: SqliteMessageIndex) -> Self {
            Self {
                inner,
                down: AtomicBool::new(false),
                writes: AtomicUsize::new(0),
            }
        }

        pub(crate) fn set_down(&self, down: bool) {
            self.down.store(down, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MessageIndex for FlakyIndex {
        async fn index_message(&self, entry: &IndexEntry) -> Result<(), IndexError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(IndexError::Unavailable("switched off".to_owned()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.index_message(entry).await
        }

        async fn search(&self, room_code: &str, text: &str, page: Page) -> Result<Vec<SearchResult>, IndexError> {
            self.inner.search(room_code, text, page).await
        }
    }
}
