// tests/ingest_pipeline.rs
//! End-to-end ingestion properties against a scratch SQLite store:
//! idempotence, dedup, monotonic score updates, exclusion precedence.

use chrono::Utc;
use tempfile::TempDir;

use macronews::ingest;
use macronews::ingest::types::RawCandidate;
use macronews::lexicon::{FieldScope, Lexicon, LexiconEntry};
use macronews::store::{NewsStore, SqliteStore};

async fn scratch_store() -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("news.db");
    let store = SqliteStore::connect(path.to_str().unwrap())
        .await
        .expect("open sqlite");
    store.init_schema().await.expect("schema");
    (store, dir)
}

fn lexicon() -> Lexicon {
    // Patterns are stored lowercase, as Lexicon::load_from would leave them.
    Lexicon {
        threshold: 1.5,
        keywords: vec![
            LexiconEntry {
                pattern: "fed".into(),
                weight: 2.0,
                scope: FieldScope::Title,
            },
            LexiconEntry {
                pattern: "inflation".into(),
                weight: 1.0,
                scope: FieldScope::Description,
            },
            LexiconEntry {
                pattern: "rate cut".into(),
                weight: 1.5,
                scope: FieldScope::Description,
            },
        ],
        exclusions: vec!["airdrop".into()],
    }
}

fn cand(source: &str, title: &str, description: &str) -> RawCandidate {
    RawCandidate {
        source_id: source.to_string(),
        category: "macro".to_string(),
        title: title.to_string(),
        description: description.to_string(),
        url: Some(format!("https://example.com/{source}")),
        published_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn ingest_twice_is_idempotent() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon();
    let batch = vec![
        cand("fed-press", "Fed holds rates steady", "no mention"),
        cand("coindesk", "Fed weighs balance sheet", "inflation cools"),
    ];

    let first = ingest::ingest_candidates(&store, &lex, batch.clone()).await;
    assert_eq!(first.inserted, 2);
    assert_eq!(first.duplicate, 0);

    let second = ingest::ingest_candidates(&store, &lex, batch).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicate, 2);
    assert_eq!(second.failed, 0);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.stories, 2);
}

#[tokio::test]
async fn normalization_equal_candidates_share_one_row() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon();

    // Same tokens after case folding, punctuation stripping and sorting.
    let batch = vec![
        cand("fed-press", "Fed Raises Interest Rates", "no mention"),
        cand("marketwatch-top", "Interest rates: FED raises!", "no mention"),
    ];

    let counts = ingest::ingest_candidates(&store, &lex, batch).await;
    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.duplicate, 1);

    // The surviving row belongs to the first source.
    let eligible = store.select_eligible(1.5, 10).await.unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].source_id, "fed-press");
}

#[tokio::test]
async fn duplicate_raises_score_but_never_lowers_it() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon();

    // Identical canonical tokens; only the low variant misses the
    // "rate cut" substring, so the scores differ.
    let low = cand("src-a", "Markets await decision", "cut in the rate expected");
    let high = cand("src-b", "Markets await decision", "rate cut expected");

    let counts = ingest::ingest_candidates(&store, &lex, vec![low.clone()]).await;
    assert_eq!(counts.inserted, 1);

    let fp = macronews::fingerprint::fingerprint(&low.title, &low.description);
    assert_eq!(
        fp,
        macronews::fingerprint::fingerprint(&high.title, &high.description)
    );
    assert_eq!(store.get_story_score(&fp).await.unwrap(), Some(0.0));

    let counts = ingest::ingest_candidates(&store, &lex, vec![high]).await;
    assert_eq!(counts.inserted, 0);
    assert_eq!(counts.duplicate, 1);
    assert_eq!(store.get_story_score(&fp).await.unwrap(), Some(1.5));

    // Replaying the low-scoring variant must not lower the stored score,
    // and must not touch the first source attribution.
    let counts = ingest::ingest_candidates(&store, &lex, vec![low]).await;
    assert_eq!(counts.duplicate, 1);
    assert_eq!(store.get_story_score(&fp).await.unwrap(), Some(1.5));

    let eligible = store.select_eligible(1.0, 10).await.unwrap();
    assert_eq!(eligible[0].source_id, "src-a");
}

#[tokio::test]
async fn exclusion_wins_over_high_weight_keyword() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon();

    let counts = ingest::ingest_candidates(
        &store,
        &lex,
        vec![cand("cointelegraph", "Fed meme coin airdrop announced", "")],
    )
    .await;

    assert_eq!(counts.filtered, 1);
    assert_eq!(counts.inserted, 0);
    // Filtered stories are never persisted, not even as rows below threshold.
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.stories, 0);
}

#[tokio::test]
async fn empty_candidates_are_filtered_not_stored() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon();

    let counts = ingest::ingest_candidates(
        &store,
        &lex,
        vec![cand("decrypt", "", ""), cand("decrypt", "   ", "\t")],
    )
    .await;

    assert_eq!(counts.filtered, 2);
    assert_eq!(store.stats().await.unwrap().stories, 0);
}

#[tokio::test]
async fn fed_title_keyword_scores_and_second_outlet_dedups() {
    let (store, _dir) = scratch_store().await;
    let lex = lexicon(); // fed: +2.0 title, inflation: +1.0 description, threshold 1.5

    let counts = ingest::ingest_candidates(
        &store,
        &lex,
        vec![cand("fed-press", "Fed holds rates steady", "no mention")],
    )
    .await;
    assert_eq!(counts.inserted, 1);

    let fp = macronews::fingerprint::fingerprint("Fed holds rates steady", "no mention");
    assert_eq!(store.get_story_score(&fp).await.unwrap(), Some(2.0));

    // Identical normalized title from a second outlet: duplicate, score
    // unchanged (2.0 >= 2.0), no new row.
    let counts = ingest::ingest_candidates(
        &store,
        &lex,
        vec![cand("cnbc-markets", "Fed Holds Rates Steady!", "no mention")],
    )
    .await;
    assert_eq!(counts.inserted, 0);
    assert_eq!(counts.duplicate, 1);
    assert_eq!(store.get_story_score(&fp).await.unwrap(), Some(2.0));

    // Above threshold and unqueued: eligible.
    let eligible = store.select_eligible(lex.threshold, 10).await.unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].fingerprint, fp);
}
