// src/scoring.rs
//! Additive keyword scoring with positional weighting and exclusion rules.
//! Pure over an immutable lexicon; no side effects.

use crate::lexicon::{FieldScope, Lexicon};
use std::collections::HashSet;

/// Sentinel score for filtered stories. Strictly below any queueing
/// threshold; filtered stories are never persisted.
pub const FILTERED_SCORE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub score: f64,
    pub matched: Vec<String>,
    pub filtered: bool,
}

impl ScoreOutcome {
    fn filtered() -> Self {
        ScoreOutcome {
            score: FILTERED_SCORE,
            matched: Vec::new(),
            filtered: true,
        }
    }
}

/// Score a story against the lexicon.
///
/// Exclusions are checked first against both fields and short-circuit: a hit
/// force-scores the story to [`FILTERED_SCORE`] regardless of positive
/// matches. Each positive entry scans only its scoped field and contributes
/// its weight once per distinct pattern per field; repeated occurrences and
/// repeated config entries do not stack.
pub fn score_story(title: &str, description: &str, lexicon: &Lexicon) -> ScoreOutcome {
    let title_lc = title.to_lowercase();
    let desc_lc = description.to_lowercase();

    for pattern in &lexicon.exclusions {
        if title_lc.contains(pattern.as_str()) || desc_lc.contains(pattern.as_str()) {
            return ScoreOutcome::filtered();
        }
    }

    let mut score = 0.0;
    let mut matched = Vec::new();
    let mut seen: HashSet<(&str, FieldScope)> = HashSet::new();

    for entry in &lexicon.keywords {
        let field = match entry.scope {
            FieldScope::Title => &title_lc,
            FieldScope::Description => &desc_lc,
        };
        if !field.contains(entry.pattern.as_str()) {
            continue;
        }
        if !seen.insert((entry.pattern.as_str(), entry.scope)) {
            continue;
        }
        score += entry.weight;
        matched.push(entry.pattern.clone());
    }

    ScoreOutcome {
        score,
        matched,
        filtered: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::FieldScope::{Description, Title};

    fn lexicon() -> Lexicon {
        Lexicon::for_tests(
            1.5,
            vec![("Fed", 2.0, Title), ("inflation", 1.0, Description)],
            vec!["airdrop"],
        )
    }

    #[test]
    fn title_and_description_weights_add() {
        let out = score_story(
            "Fed holds rates steady",
            "inflation expectations cool down",
            &lexicon(),
        );
        assert!(!out.filtered);
        assert_eq!(out.score, 3.0);
        assert_eq!(out.matched, vec!["fed".to_string(), "inflation".into()]);
    }

    #[test]
    fn scoped_field_only() {
        // "fed" only in the description; the title-scoped entry must not fire.
        let out = score_story("Rates on hold", "the fed stays put", &lexicon());
        assert_eq!(out.score, 0.0);
        assert!(out.matched.is_empty());
    }

    #[test]
    fn repeated_occurrences_do_not_stack() {
        let out = score_story("Fed watches Fed minutes on Fed day", "", &lexicon());
        assert_eq!(out.score, 2.0);
    }

    #[test]
    fn duplicate_config_entries_do_not_stack() {
        let lex = Lexicon::for_tests(
            1.0,
            vec![("fed", 2.0, Title), ("fed", 2.0, Title)],
            vec![],
        );
        let out = score_story("Fed speaks", "", &lex);
        assert_eq!(out.score, 2.0);
    }

    #[test]
    fn same_pattern_counts_once_per_field() {
        let lex = Lexicon::for_tests(
            1.0,
            vec![("fed", 2.0, Title), ("fed", 1.0, Description)],
            vec![],
        );
        let out = score_story("Fed decision", "the fed explains", &lex);
        assert_eq!(out.score, 3.0);
    }

    #[test]
    fn exclusion_beats_high_value_keyword() {
        let out = score_story("Fed meme coin airdrop announced", "", &lexicon());
        assert!(out.filtered);
        assert_eq!(out.score, FILTERED_SCORE);
        assert!(out.matched.is_empty());
    }

    #[test]
    fn exclusion_in_description_also_filters() {
        let out = score_story("Fed news", "claim the airdrop today", &lexicon());
        assert!(out.filtered);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let out = score_story("FED HOLDS", "INFLATION DATA", &lexicon());
        assert_eq!(out.score, 3.0);
    }
}
