// src/store/sqlite.rs
//! SQLite backend: the local/default store. WAL keeps readers and the single
//! writer out of each other's way across overlapping batch invocations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Row, Sqlite,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::StoreError;
use crate::model::{
    BilingualContent, ClaimedStory, FailOutcome, NewStory, QueueStatus, Story, SweepCounts,
    UpsertOutcome,
};
use crate::report::StoreStats;
use crate::store::{NewsStore, STALE_SWEEP_ERROR};

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. Accepts a bare file path or
    /// a full `sqlite:` URL.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{}", path)
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::Unavailable)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StoreError::Unavailable)?;

        info!(target: "store", url = %url, "sqlite store opened");
        Ok(SqliteStore { pool })
    }
}

fn row_to_story(row: &sqlx::sqlite::SqliteRow) -> Result<Story, sqlx::Error> {
    Ok(Story {
        fingerprint: row.try_get("fingerprint")?,
        source_id: row.try_get("source_id")?,
        category: row.try_get("category")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        published_at: row.try_get("published_at")?,
        score: row.try_get("score")?,
        first_seen_at: row.try_get("first_seen_at")?,
    })
}

#[async_trait]
impl NewsStore for SqliteStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                fingerprint      TEXT PRIMARY KEY,
                source_id        TEXT NOT NULL,
                category         TEXT NOT NULL DEFAULT '',
                title            TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                url              TEXT,
                published_at     TEXT,
                score            REAL NOT NULL DEFAULT 0,
                matched_keywords TEXT NOT NULL DEFAULT '[]',
                first_seen_at    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_stories_score ON stories (score DESC, first_seen_at ASC);

            CREATE TABLE IF NOT EXISTS rewrite_queue (
                story_fingerprint TEXT PRIMARY KEY REFERENCES stories (fingerprint),
                status            TEXT NOT NULL DEFAULT 'queued',
                attempts          INTEGER NOT NULL DEFAULT 0,
                last_error        TEXT,
                result            TEXT,
                created_at        TEXT NOT NULL,
                claimed_at        TEXT,
                processed_at      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_queue_status ON rewrite_queue (status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;
        Ok(())
    }

    async fn upsert_story(&self, story: &NewStory) -> Result<UpsertOutcome, StoreError> {
        let matched = serde_json::to_string(&story.matched_keywords).unwrap_or_default();

        let inserted = sqlx::query(
            r#"
            INSERT INTO stories
                (fingerprint, source_id, category, title, description, url,
                 published_at, score, matched_keywords, first_seen_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(&story.fingerprint)
        .bind(&story.source_id)
        .bind(&story.category)
        .bind(&story.title)
        .bind(&story.description)
        .bind(&story.url)
        .bind(story.published_at)
        .bind(story.score)
        .bind(&matched)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok(UpsertOutcome::Inserted);
        }

        // Duplicate: raise the score in place iff the new variant scored
        // higher. source_id and first_seen_at stay untouched.
        let raised = sqlx::query(
            r#"
            UPDATE stories
            SET score = ?2, matched_keywords = ?3
            WHERE fingerprint = ?1 AND score < ?2
            "#,
        )
        .bind(&story.fingerprint)
        .bind(story.score)
        .bind(&matched)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if raised == 1 {
            Ok(UpsertOutcome::UpdatedScore)
        } else {
            Ok(UpsertOutcome::DuplicateNoChange)
        }
    }

    async fn get_story_score(&self, fingerprint: &str) -> Result<Option<f64>, StoreError> {
        let row = sqlx::query("SELECT score FROM stories WHERE fingerprint = ?1")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => Some(r.try_get("score").map_err(StoreError::Query)?),
            None => None,
        })
    }

    async fn select_eligible(
        &self,
        min_score: f64,
        limit: u32,
    ) -> Result<Vec<Story>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.fingerprint, s.source_id, s.category, s.title, s.description,
                   s.url, s.published_at, s.score, s.first_seen_at
            FROM stories s
            LEFT JOIN rewrite_queue q ON q.story_fingerprint = s.fingerprint
            WHERE s.score >= ?1 AND q.story_fingerprint IS NULL
            ORDER BY s.score DESC, s.first_seen_at ASC
            LIMIT ?2
            "#,
        )
        .bind(min_score)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| row_to_story(r).map_err(StoreError::Query))
            .collect()
    }

    async fn create_queue_entry(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let created = sqlx::query(
            r#"
            INSERT INTO rewrite_queue (story_fingerprint, status, created_at)
            VALUES (?1, 'queued', ?2)
            ON CONFLICT (story_fingerprint) DO NOTHING
            "#,
        )
        .bind(fingerprint)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(created == 1)
    }

    async fn claim_queued(&self, limit: u32) -> Result<Vec<ClaimedStory>, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE rewrite_queue
            SET status = 'processing', claimed_at = ?1
            WHERE status = 'queued'
              AND story_fingerprint IN (
                  SELECT story_fingerprint FROM rewrite_queue
                  WHERE status = 'queued'
                  ORDER BY created_at ASC, story_fingerprint ASC
                  LIMIT ?2
              )
            RETURNING story_fingerprint, attempts
            "#,
        )
        .bind(Utc::now())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in rows {
            let fingerprint: String = row.try_get("story_fingerprint")?;
            let attempts: i64 = row.try_get("attempts")?;
            let story = sqlx::query(
                r#"
                SELECT source_id, category, title, description, url
                FROM stories WHERE fingerprint = ?1
                "#,
            )
            .bind(&fingerprint)
            .fetch_one(&self.pool)
            .await?;

            claimed.push(ClaimedStory {
                fingerprint,
                attempts: attempts as u32,
                source_id: story.try_get("source_id")?,
                category: story.try_get("category")?,
                title: story.try_get("title")?,
                description: story.try_get("description")?,
                url: story.try_get("url")?,
            });
        }
        Ok(claimed)
    }

    async fn complete(
        &self,
        fingerprint: &str,
        result: &BilingualContent,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(result)
            .map_err(|e| StoreError::Query(sqlx::Error::Protocol(format!("encoding rewrite result: {e}"))))?;

        let updated = sqlx::query(
            r#"
            UPDATE rewrite_queue
            SET status = 'done', result = ?2, last_error = NULL,
                claimed_at = NULL, processed_at = ?3
            WHERE story_fingerprint = ?1 AND status = 'processing'
            "#,
        )
        .bind(fingerprint)
        .bind(&payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            Ok(())
        } else {
            Err(StoreError::InvalidTransition {
                fingerprint: fingerprint.to_string(),
            })
        }
    }

    async fn fail(
        &self,
        fingerprint: &str,
        error: &str,
        max_attempts: u32,
    ) -> Result<FailOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE rewrite_queue
            SET attempts = attempts + 1,
                last_error = ?2,
                status = CASE WHEN attempts + 1 >= ?3 THEN 'failed' ELSE 'queued' END,
                claimed_at = NULL,
                processed_at = CASE WHEN attempts + 1 >= ?3 THEN ?4 ELSE NULL END
            WHERE story_fingerprint = ?1 AND status = 'processing'
            RETURNING status
            "#,
        )
        .bind(fingerprint)
        .bind(error)
        .bind(max_attempts as i64)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let status: String = r.try_get("status")?;
                match QueueStatus::parse(&status) {
                    Some(QueueStatus::Failed) => Ok(FailOutcome::Failed),
                    _ => Ok(FailOutcome::Requeued),
                }
            }
            None => Err(StoreError::InvalidTransition {
                fingerprint: fingerprint.to_string(),
            }),
        }
    }

    async fn sweep_stale_processing(
        &self,
        stale_after: Duration,
        max_attempts: u32,
    ) -> Result<SweepCounts, StoreError> {
        let cutoff: DateTime<Utc> = Utc::now()
            - chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::zero());

        let rows = sqlx::query(
            r#"
            UPDATE rewrite_queue
            SET attempts = attempts + 1,
                last_error = ?1,
                status = CASE WHEN attempts + 1 >= ?2 THEN 'failed' ELSE 'queued' END,
                claimed_at = NULL
            WHERE status = 'processing' AND claimed_at IS NOT NULL AND claimed_at < ?3
            RETURNING status
            "#,
        )
        .bind(STALE_SWEEP_ERROR)
        .bind(max_attempts as i64)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = SweepCounts::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            match QueueStatus::parse(&status) {
                Some(QueueStatus::Failed) => counts.failed += 1,
                _ => counts.requeued += 1,
            }
        }
        Ok(counts)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let stories: i64 = sqlx::query("SELECT COUNT(*) AS n FROM stories")
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;

        let mut stats = StoreStats {
            stories: stories as u64,
            ..StoreStats::default()
        };

        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM rewrite_queue GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match QueueStatus::parse(&status) {
                Some(QueueStatus::Queued) => stats.queued = n as u64,
                Some(QueueStatus::Processing) => stats.processing = n as u64,
                Some(QueueStatus::Done) => stats.done = n as u64,
                Some(QueueStatus::Failed) => stats.failed = n as u64,
                None => {}
            }
        }
        Ok(stats)
    }
}
