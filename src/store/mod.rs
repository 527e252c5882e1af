// src/store/mod.rs
//! Persistence gateway. The pipeline and the queue state machine depend only
//! on the [`NewsStore`] trait; two interchangeable backends (local SQLite,
//! networked Postgres) are selected by configuration.

pub mod postgres;
pub mod sqlite;

use crate::config::{Backend, DatabaseConfig};
use crate::error::StoreError;
use crate::model::{
    BilingualContent, ClaimedStory, FailOutcome, NewStory, Story, SweepCounts, UpsertOutcome,
};
use crate::report::StoreStats;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Storage contract required by the core. All mutations are per-row atomic:
/// upserts go through a unique-constraint insert, queue transitions through
/// status-conditioned updates, so overlapping invocations stay correct.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Create tables and indexes if missing. Idempotent.
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// Insert-or-skip by fingerprint. An existing row keeps its
    /// `source_id`/`first_seen_at`; its score is raised in place iff the
    /// incoming score is higher, never lowered.
    async fn upsert_story(&self, story: &NewStory) -> Result<UpsertOutcome, StoreError>;

    async fn get_story_score(&self, fingerprint: &str) -> Result<Option<f64>, StoreError>;

    /// Stories at or above `min_score` with no queue entry, ordered by score
    /// descending then `first_seen_at` ascending (oldest breaks ties).
    async fn select_eligible(&self, min_score: f64, limit: u32)
        -> Result<Vec<Story>, StoreError>;

    /// Create a `queued` entry. Returns false when one already exists (the
    /// enqueue idempotence guard).
    async fn create_queue_entry(&self, fingerprint: &str) -> Result<bool, StoreError>;

    /// Atomically claim up to `limit` `queued` entries into `processing`,
    /// stamping `claimed_at`. Two concurrent callers never claim the same
    /// entry.
    async fn claim_queued(&self, limit: u32) -> Result<Vec<ClaimedStory>, StoreError>;

    /// `processing -> done`, storing the result and clearing `last_error`.
    async fn complete(
        &self,
        fingerprint: &str,
        result: &BilingualContent,
    ) -> Result<(), StoreError>;

    /// `processing -> queued|failed`: bump `attempts`, record `last_error`,
    /// requeue below the cap, fail at it.
    async fn fail(
        &self,
        fingerprint: &str,
        error: &str,
        max_attempts: u32,
    ) -> Result<FailOutcome, StoreError>;

    /// Requeue entries stuck in `processing` longer than `stale_after`,
    /// treating staleness as an implicit failure (counts toward attempts;
    /// entries at the cap go to `failed`).
    async fn sweep_stale_processing(
        &self,
        stale_after: Duration,
        max_attempts: u32,
    ) -> Result<SweepCounts, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Open the backend named by configuration.
pub async fn connect(cfg: &DatabaseConfig) -> Result<Arc<dyn NewsStore>, StoreError> {
    match cfg.backend {
        Backend::Sqlite => Ok(Arc::new(SqliteStore::connect(&cfg.url).await?)),
        Backend::Postgres => Ok(Arc::new(PostgresStore::connect(&cfg.url).await?)),
    }
}

/// Error text recorded by the staleness sweep.
pub(crate) const STALE_SWEEP_ERROR: &str = "stale processing entry swept";
