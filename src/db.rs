use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await
}

/// Opens the primary store (rooms, memberships, members, messages, outbox).
pub async fn open_primary(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(url, 16).await?;
    sqlx::migrate!("migrations/primary").run(&pool).await?;
    info!(%url, "primary store ready");
    Ok(pool)
}

/// Opens the search index, a separate database from the primary store.
pub async fn open_index(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(url, 4).await?;
    sqlx::migrate!("migrations/index").run(&pool).await?;
    info!(%url, "message index ready");
    Ok(pool)
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Both stores in a temp dir that lives as long as the returned guard.
    pub(crate) async fn stores() -> (TempDir, SqlitePool, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let primary = super::open_primary(&format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("chat.db").display()
        ))
        .await
        .unwrap();
        let index = super::open_index(&format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("index.db").display()
        ))
        .await
        .unwrap();
        (dir, primary, index)
    }
}
