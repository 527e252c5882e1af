// src/report.rs
//! Structured run summaries. Every invocation ends with one of these;
//! partial success is the expected common case, not an error state.

use crate::model::SweepCounts;
use serde::Serialize;

/// Insert-or-skip decisions made by one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    pub inserted: u64,
    pub duplicate: u64,
    pub filtered: u64,
    /// Per-candidate store failures, absorbed without aborting the batch.
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub sources_total: usize,
    pub sources_ok: usize,
    pub candidates: u64,
    #[serde(flatten)]
    pub counts: IngestCounts,
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EnqueueReport {
    pub queued: u64,
    /// Eligible stories skipped because an entry already existed; the
    /// idempotence guard firing, not an error.
    pub already_queued: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProcessReport {
    pub swept: SweepCounts,
    pub claimed: u64,
    pub done: u64,
    pub requeued: u64,
    pub failed: u64,
    /// Store write errors while recording rewrite outcomes.
    pub store_errors: u64,
}

/// Corpus/queue counts for the `stats` subcommand.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub stories: u64,
    pub queued: u64,
    pub processing: u64,
    pub done: u64,
    pub failed: u64,
}
