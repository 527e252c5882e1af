// src/model.rs
//! Data model shared by the pipeline, the queue state machine, and the
//! persistence gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A story the ingestion pipeline wants persisted. `fingerprint` is the
/// identity; everything else is payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub fingerprint: String,
    pub source_id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub matched_keywords: Vec<String>,
}

/// A persisted story row. Exactly one exists per fingerprint; `source_id`
/// and `first_seen_at` record the first introduction and never change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    pub fingerprint: String,
    pub source_id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub first_seen_at: DateTime<Utc>,
}

/// Rewrite lifecycle states. "Eligible" is implicit: a story above threshold
/// with no queue row yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Processing => "processing",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(QueueStatus::Queued),
            "processing" => Some(QueueStatus::Processing),
            "done" => Some(QueueStatus::Done),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}

/// A queue entry freshly claimed into `processing`, joined with the story
/// columns the rewriter needs. One read, no second round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedStory {
    pub fingerprint: String,
    pub attempts: u32,
    pub source_id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
}

/// Bilingual content bundle produced by the rewrite collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilingualContent {
    pub title_pt: String,
    pub content_pt: String,
    pub summary_pt: String,
    pub title_en: String,
    pub content_en: String,
    pub summary_en: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What an upsert-by-fingerprint did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed; a new story was inserted.
    Inserted,
    /// Row existed and the incoming score was higher; stored score raised.
    UpdatedScore,
    /// Row existed; nothing changed.
    DuplicateNoChange,
}

/// Where a failed rewrite attempt landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    Requeued,
    Failed,
}

/// Staleness sweep results: entries requeued vs pushed over the attempts cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub requeued: u64,
    pub failed: u64,
}
