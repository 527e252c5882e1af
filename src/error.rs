// src/error.rs
//! Error taxonomy for the pipeline. Per-item errors are absorbed into run
//! counts; only whole-dependency failures abort an invocation.

use thiserror::Error;

/// One source failed to fetch or parse. Skips that source, never the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed parse failed: {0}")]
    Parse(String),
    #[error("feed contained no items")]
    EmptyFeed,
}

/// Storage gateway errors. `Unavailable` is fatal for the invocation;
/// `Query` is absorbed per candidate/entry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    /// Status-conditioned update matched no row, i.e. the entry was not in
    /// the state the transition requires.
    #[error("queue entry {fingerprint} not in expected state")]
    InvalidTransition { fingerprint: String },
}

/// Rewrite collaborator failures. Drive the queue retry/fail transition.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("rewrite call timed out")]
    Timeout,
    #[error("rewrite provider returned invalid content: {0}")]
    InvalidResponse(String),
    #[error("rewrite provider quota exceeded")]
    QuotaExceeded,
}
