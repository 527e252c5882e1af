// src/ingest/mod.rs
//! Ingestion pipeline: raw candidates -> fingerprint -> score ->
//! insert-or-skip against the persistence gateway. Per-candidate failures
//! are absorbed into counts; only a dead store aborts an invocation.

pub mod catalog;
pub mod rss;
pub mod types;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::fingerprint;
use crate::lexicon::Lexicon;
use crate::model::{NewStory, UpsertOutcome};
use crate::report::{FetchReport, IngestCounts, SourceFailure};
use crate::scoring;
use crate::store::NewsStore;
use crate::ingest::types::{RawCandidate, SourceProvider};

/// One-time metrics registration (so series show up on whatever recorder
/// the embedder installs).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items parsed from feed providers.");
        describe_counter!("ingest_inserted_total", "New stories persisted.");
        describe_counter!("ingest_duplicate_total", "Candidates deduplicated by fingerprint.");
        describe_counter!(
            "ingest_filtered_total",
            "Candidates dropped by empty text or exclusion patterns."
        );
        describe_counter!("ingest_failed_total", "Per-candidate store write failures.");
        describe_counter!("ingest_source_errors_total", "Source fetch/parse errors.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text for storage: HTML entity decode, strip tags, fold
/// curly quotes to ASCII, collapse whitespace, cap runaway length.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // Length cap: 2000 chars (rewrite prompts truncate anyway)
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Run the insert-or-skip decision for every candidate, in the order given.
/// The caller is responsible for that order being source-declaration order.
pub async fn ingest_candidates(
    store: &dyn NewsStore,
    lexicon: &Lexicon,
    candidates: Vec<RawCandidate>,
) -> IngestCounts {
    ensure_metrics_described();
    let mut counts = IngestCounts::default();

    for cand in candidates {
        let fp = fingerprint::fingerprint(&cand.title, &cand.description);
        if fingerprint::is_sentinel(&fp) {
            counts.filtered += 1;
            continue;
        }

        let outcome = scoring::score_story(&cand.title, &cand.description, lexicon);
        if outcome.filtered {
            // Filtered stories are never persisted, not even as duplicates.
            counts.filtered += 1;
            continue;
        }

        let story = NewStory {
            fingerprint: fp,
            source_id: cand.source_id,
            category: cand.category,
            title: cand.title,
            description: cand.description,
            url: cand.url,
            published_at: cand.published_at,
            score: outcome.score,
            matched_keywords: outcome.matched,
        };

        match store.upsert_story(&story).await {
            Ok(UpsertOutcome::Inserted) => counts.inserted += 1,
            Ok(UpsertOutcome::UpdatedScore) | Ok(UpsertOutcome::DuplicateNoChange) => {
                counts.duplicate += 1
            }
            Err(e) => {
                warn!(target: "ingest", error = %e, fingerprint = %story.fingerprint, "story upsert failed");
                counts.failed += 1;
            }
        }
    }

    counter!("ingest_inserted_total").increment(counts.inserted);
    counter!("ingest_duplicate_total").increment(counts.duplicate);
    counter!("ingest_filtered_total").increment(counts.filtered);
    counter!("ingest_failed_total").increment(counts.failed);

    counts
}

/// Fetch every provider concurrently and merge results in provider
/// (declaration) order, independent of completion order. Feed order is
/// preserved within each source.
pub async fn fetch_all(
    providers: &[Box<dyn SourceProvider>],
) -> (Vec<RawCandidate>, Vec<SourceFailure>) {
    let results = join_all(providers.iter().map(|p| p.fetch_latest())).await;

    let mut merged = Vec::new();
    let mut failures = Vec::new();
    for (provider, result) in providers.iter().zip(results) {
        match result {
            Ok(mut items) => {
                debug!(target: "ingest", source = provider.source_id(), items = items.len(), "source fetched");
                merged.append(&mut items);
            }
            Err(e) => {
                warn!(target: "ingest", source = provider.source_id(), error = %e, "source fetch failed");
                counter!("ingest_source_errors_total").increment(1);
                failures.push(SourceFailure {
                    source_id: provider.source_id().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    (merged, failures)
}

/// One full fetch cycle: fetch all sources, then ingest the merged batch.
pub async fn run_fetch(
    store: &dyn NewsStore,
    lexicon: &Lexicon,
    providers: &[Box<dyn SourceProvider>],
) -> FetchReport {
    ensure_metrics_described();

    let (candidates, failures) = fetch_all(providers).await;
    let sources_total = providers.len();
    let sources_ok = sources_total - failures.len();
    let candidate_count = candidates.len() as u64;

    let counts = ingest_candidates(store, lexicon, candidates).await;

    FetchReport {
        sources_total,
        sources_ok,
        candidates: candidate_count,
        counts,
        failures,
    }
}
