// src/fingerprint.rs
//! Content fingerprinting for dedup. Two stories are the same event iff
//! their fingerprints are equal; near-duplicates with materially different
//! wording stay distinct (precision over recall, O(1) lookup).

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Reserved identity for empty/whitespace-only input. Never stored; the
/// pipeline counts such candidates as filtered.
pub const SENTINEL_FINGERPRINT: &str = "0000000000000000";

const MIN_TOKEN_LEN: usize = 3;
const MAX_TOKENS: usize = 10;

// The corpus is bilingual (EN + PT-BR), so both stopword lists apply.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "the", "and", "but", "for", "with", "from", "was", "are", "were",
        "been", "have", "has", "had", "does", "did", "will", "would",
        "could", "should", "may", "might", "must", "shall", "can", "need",
        "its", "this", "that", "these", "those", "you", "she", "they",
        "what", "which", "who", "whom", "when", "where", "why", "how",
        "all", "each", "every", "both", "few", "more", "most", "other",
        "some", "such", "not", "only", "own", "same", "than", "too",
        "very", "just", "also", "now", "here", "there", "says", "said",
        "report", "reports", "according", "new", "news",
        // Portuguese
        "uma", "uns", "umas", "das", "dos", "nas", "nos", "por", "para",
        "com", "sem", "sob", "sobre", "entre", "mas", "que", "qual",
        "quais", "como", "quando", "onde", "porque", "isso", "isto",
        "esse", "essa", "este", "esta", "aquele", "aquela", "ser",
        "estar", "ter", "haver", "fazer", "dizer", "disse", "diz", "vai",
        "vao", "pode", "podem", "deve", "devem", "segundo", "ainda",
        "mais", "menos", "muito", "pouco", "bem", "mal", "sempre",
        "nunca", "noticia", "noticias", "novo", "nova", "novos", "novas",
    ]
    .into_iter()
    .collect()
});

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));
static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)[^\w\s]").expect("punct regex"));
static RE_BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").expect("number regex"));

/// Canonical token sequence for identity comparison: lowercase, strip URLs,
/// punctuation and bare numbers, drop stopwords and short tokens, sort so
/// word order does not matter, cap at the most significant tokens.
pub fn canonical_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let no_urls = RE_URL.replace_all(&lowered, " ");
    let no_punct = RE_NON_WORD.replace_all(&no_urls, " ");
    let no_nums = RE_BARE_NUMBER.replace_all(&no_punct, " ");

    let mut tokens: Vec<String> = no_nums
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_LEN && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect();
    tokens.sort();
    tokens.truncate(MAX_TOKENS);
    tokens
}

/// Stable content identity over title + description. Total and
/// deterministic; empty input maps to [`SENTINEL_FINGERPRINT`].
pub fn fingerprint(title: &str, description: &str) -> String {
    let combined = format!("{} {}", title, description);
    let tokens = canonical_tokens(&combined);
    if tokens.is_empty() {
        return SENTINEL_FINGERPRINT.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(tokens.join(" ").as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// True when the fingerprint is the reserved empty sentinel.
pub fn is_sentinel(fp: &str) -> bool {
    fp == SENTINEL_FINGERPRINT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = fingerprint("Fed Raises Interest Rates", "Markets react to the decision");
        let b = fingerprint("Fed Raises Interest Rates", "Markets react to the decision");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn word_order_and_punctuation_do_not_matter() {
        let a = fingerprint("Interest rates raised, Fed announces!", "");
        let b = fingerprint("Fed announces: interest rates raised", "");
        assert_eq!(a, b);
    }

    #[test]
    fn case_is_folded() {
        assert_eq!(
            fingerprint("BITCOIN DROPS SHARPLY", ""),
            fingerprint("bitcoin drops sharply", "")
        );
    }

    #[test]
    fn empty_input_maps_to_sentinel() {
        assert_eq!(fingerprint("", ""), SENTINEL_FINGERPRINT);
        assert_eq!(fingerprint("   ", "\t\n"), SENTINEL_FINGERPRINT);
        // Stopwords-only text has no significant tokens either.
        assert_eq!(fingerprint("the and for", "de da do"), SENTINEL_FINGERPRINT);
        assert!(is_sentinel(&fingerprint("", "")));
    }

    #[test]
    fn urls_and_bare_numbers_are_ignored() {
        let a = fingerprint("Inflation hits 2024 https://example.com/x", "");
        let b = fingerprint("Inflation hits", "");
        assert_eq!(a, b);
    }

    #[test]
    fn materially_different_wording_stays_distinct() {
        let a = fingerprint("Fed raises interest rates by a quarter point", "");
        let b = fingerprint("Central bank increases borrowing costs", "");
        assert_ne!(a, b);
    }
}
