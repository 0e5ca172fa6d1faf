use std::sync::Arc;

use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{debug, error, info, warn};

use super::MessageIndex;
use crate::{
    config::RelayConfig,
    error::ChatResult,
    model::IndexEntry,
    store::outbox,
};

/// Moves committed messages from the outbox into the search index.
///
/// Failed writes stay in the outbox and are retried with exponential backoff,
/// so an index outage only delays search visibility.
pub struct IndexRelay {
    db_pool: SqlitePool,
    index: Arc<dyn MessageIndex>,
    config: RelayConfig,
    wake: Notify,
}

/// Outcome of one [`IndexRelay::drain`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub indexed: usize,
    pub failed: usize,
}

impl IndexRelay {
    pub fn new(db_pool: SqlitePool, index: Arc<dyn MessageIndex>, config: RelayConfig) -> Self {
        Self {
            db_pool,
            index,
            config,
            wake: Notify::new(),
        }
    }

    pub fn index(&self) -> &Arc<dyn MessageIndex> {
        &self.index
    }

    /// Called after a commit added outbox rows.
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Number of messages not yet visible to search.
    pub async fn pending_index_writes(&self) -> ChatResult<i64> {
        outbox::pending_count(&self.db_pool).await
    }

    /// Indexes everything that is due, batch by batch.
    pub async fn drain(&self) -> ChatResult<DrainReport> {
        let mut report = DrainReport::default();

        loop {
            let now = OffsetDateTime::now_utc();
            let batch = outbox::due(&self.db_pool, now, self.config.batch_size).await?;
            let full = batch.len() as i64 >= self.config.batch_size;
            let mut failed_in_batch = 0;

            for pending in batch {
                let message_id = pending.message.id;
                let entry = IndexEntry::from(&pending.message);

                match self.index.index_message(&entry).await {
                    Ok(()) => {
                        outbox::acknowledge(&self.db_pool, message_id).await?;
                        report.indexed += 1;
                    }
                    Err(e) => {
                        let attempts = pending.attempts + 1;
                        let delay = self.config.backoff(attempts);
                        warn!(
                            %message_id,
                            attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "index write failed, will retry"
                        );
                        outbox::reschedule(&self.db_pool, message_id, attempts, now + delay, &e.to_string())
                            .await?;
                        failed_in_batch += 1;
                    }
                }
            }

            report.failed += failed_in_batch;
            // stop on failure so a dead index isn't hammered within one pass
            if !full || failed_in_batch > 0 {
                break;
            }
        }

        if report.indexed > 0 || report.failed > 0 {
            debug!(indexed = report.indexed, failed = report.failed, "outbox drained");
        }
        Ok(report)
    }

    /// Drains whenever notified, and on every poll interval to pick up retries.
    pub async fn run(self: Arc<Self>) {
        info!(poll_ms = self.config.poll_interval.as_millis() as u64, "index relay started");
        loop {
            tokio::select! {
                _ = self.wake.notified() => {},
                _ = tokio::time::sleep(self.config.poll_interval) => {},
            }

            if let Err(e) = self.drain().await {
                error!(error = %e, "index relay pass failed");
            }
        }
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }
}
