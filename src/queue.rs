// src/queue.rs
//! Rewrite queue state machine.
//!
//! ```text
//! eligible --(enqueue, score >= threshold)--> queued
//! queued   --(worker claims)----------------> processing
//! processing --(rewrite ok)-----------------> done      [terminal]
//! processing --(fails, attempts < max)------> queued
//! processing --(fails, attempts >= max)-----> failed    [terminal]
//! ```
//!
//! "Eligible" is implicit (story above threshold, no entry). All transitions
//! go through status-conditioned store updates, so concurrent invocations
//! cannot claim or move the same entry twice. Nothing ever leaves `done` or
//! `failed` automatically.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{RewriteError, StoreError};
use crate::model::{ClaimedStory, FailOutcome};
use crate::report::{EnqueueReport, ProcessReport};
use crate::rewrite::Rewriter;
use crate::store::NewsStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("queue_enqueued_total", "Stories newly queued for rewrite.");
        describe_counter!("queue_claimed_total", "Entries claimed into processing.");
        describe_counter!("queue_done_total", "Rewrites completed.");
        describe_counter!("queue_requeued_total", "Failed attempts sent back to queued.");
        describe_counter!("queue_failed_total", "Entries exhausted to terminal failed.");
        describe_counter!("queue_swept_total", "Stale processing entries swept.");
    });
}

/// Retry/timeout knobs for one `process` invocation.
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    pub max_attempts: u32,
    pub stale_after: Duration,
    pub rewrite_timeout: Duration,
}

/// Queue every eligible story (score at or above `min_score`, no entry
/// yet), best first. Idempotent: re-running queues nothing new as long as
/// the eligible set is unchanged.
pub async fn enqueue(
    store: &dyn NewsStore,
    min_score: f64,
    limit: u32,
) -> Result<EnqueueReport, StoreError> {
    ensure_metrics_described();

    let eligible = store.select_eligible(min_score, limit).await?;
    let mut report = EnqueueReport::default();

    for story in &eligible {
        match store.create_queue_entry(&story.fingerprint).await {
            Ok(true) => report.queued += 1,
            // Entry already present (or an overlapping invocation won the
            // race); the idempotence guard held.
            Ok(false) => report.already_queued += 1,
            Err(e) => {
                warn!(target: "queue", error = %e, fingerprint = %story.fingerprint, "enqueue failed");
            }
        }
    }

    counter!("queue_enqueued_total").increment(report.queued);
    info!(target: "queue", queued = report.queued, already = report.already_queued, "enqueue finished");
    Ok(report)
}

/// Drain one batch: sweep stale entries, claim up to `limit` queued
/// entries, rewrite each under a bounded timeout, persist the outcome.
/// Per-entry failures drive the retry/fail transition and never abort the
/// batch.
pub async fn process_queue(
    store: &dyn NewsStore,
    rewriter: &dyn Rewriter,
    limit: u32,
    policy: QueuePolicy,
) -> Result<ProcessReport, StoreError> {
    ensure_metrics_described();
    let mut report = ProcessReport::default();

    // Recover entries stranded by a killed run before claiming new work.
    report.swept = store
        .sweep_stale_processing(policy.stale_after, policy.max_attempts)
        .await?;
    if report.swept.requeued + report.swept.failed > 0 {
        counter!("queue_swept_total").increment(report.swept.requeued + report.swept.failed);
        info!(target: "queue", requeued = report.swept.requeued, failed = report.swept.failed, "stale sweep");
    }

    let claimed = store.claim_queued(limit).await?;
    report.claimed = claimed.len() as u64;
    counter!("queue_claimed_total").increment(report.claimed);

    for entry in claimed {
        let outcome = rewrite_bounded(rewriter, &entry, policy.rewrite_timeout).await;
        match outcome {
            Ok(content) => match store.complete(&entry.fingerprint, &content).await {
                Ok(()) => {
                    report.done += 1;
                    counter!("queue_done_total").increment(1);
                    info!(target: "queue", fingerprint = %entry.fingerprint, "rewrite done");
                }
                Err(e) => {
                    report.store_errors += 1;
                    warn!(target: "queue", error = %e, fingerprint = %entry.fingerprint, "storing rewrite result failed");
                }
            },
            Err(rewrite_err) => {
                warn!(
                    target: "queue",
                    fingerprint = %entry.fingerprint,
                    attempt = entry.attempts + 1,
                    error = %rewrite_err,
                    "rewrite attempt failed"
                );
                match store
                    .fail(&entry.fingerprint, &rewrite_err.to_string(), policy.max_attempts)
                    .await
                {
                    Ok(FailOutcome::Requeued) => {
                        report.requeued += 1;
                        counter!("queue_requeued_total").increment(1);
                    }
                    Ok(FailOutcome::Failed) => {
                        report.failed += 1;
                        counter!("queue_failed_total").increment(1);
                    }
                    Err(e) => {
                        report.store_errors += 1;
                        warn!(target: "queue", error = %e, fingerprint = %entry.fingerprint, "recording rewrite failure failed");
                    }
                }
            }
        }
    }

    Ok(report)
}

/// The collaborator call with the invocation-level timeout on top; expiry
/// is a plain `Timeout` failure and drives the same transition.
async fn rewrite_bounded(
    rewriter: &dyn Rewriter,
    entry: &ClaimedStory,
    timeout: Duration,
) -> Result<crate::model::BilingualContent, RewriteError> {
    match tokio::time::timeout(timeout, rewriter.rewrite(entry)).await {
        Ok(result) => result,
        Err(_) => Err(RewriteError::Timeout),
    }
}
