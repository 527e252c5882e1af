// src/lexicon.rs
//! Keyword lexicon: immutable per-invocation configuration driving the
//! scoring engine. Loaded once from TOML and passed by reference, never a
//! process-wide mutable global.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LEXICON_PATH: &str = "config/lexicon.toml";
pub const ENV_LEXICON_PATH: &str = "MACRONEWS_LEXICON_PATH";

/// Which story field a lexicon entry scans. Title carries the higher weight
/// class in the shipped config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    Title,
    Description,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LexiconEntry {
    /// Case-insensitive substring pattern (folded to lowercase at load).
    pub pattern: String,
    pub weight: f64,
    pub scope: FieldScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    /// Queueing threshold: stories scoring at or above this are eligible.
    pub threshold: f64,
    #[serde(rename = "keyword", default)]
    pub keywords: Vec<LexiconEntry>,
    /// Any match in title or description force-filters the story.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Lexicon {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        let lex: Lexicon = toml::from_str(&content)
            .with_context(|| format!("parsing lexicon toml {}", path.display()))?;
        Ok(lex.folded())
    }

    /// Load using env var + fallback:
    /// 1) $MACRONEWS_LEXICON_PATH
    /// 2) config/lexicon.toml
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_LEXICON_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEXICON_PATH));
        Self::load_from(&path)
    }

    /// Fold all patterns to lowercase so matching is a plain substring test.
    fn folded(mut self) -> Self {
        for e in &mut self.keywords {
            e.pattern = e.pattern.trim().to_lowercase();
        }
        self.keywords.retain(|e| !e.pattern.is_empty());
        for x in &mut self.exclusions {
            *x = x.trim().to_lowercase();
        }
        self.exclusions.retain(|x| !x.is_empty());
        self
    }

    #[cfg(test)]
    pub fn for_tests(
        threshold: f64,
        keywords: Vec<(&str, f64, FieldScope)>,
        exclusions: Vec<&str>,
    ) -> Self {
        Lexicon {
            threshold,
            keywords: keywords
                .into_iter()
                .map(|(p, w, s)| LexiconEntry {
                    pattern: p.to_string(),
                    weight: w,
                    scope: s,
                })
                .collect(),
            exclusions: exclusions.into_iter().map(str::to_string).collect(),
        }
        .folded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_and_folds_case() {
        let toml = r#"
            threshold = 2.0
            exclusions = [" Airdrop ", ""]

            [[keyword]]
            pattern = "Fed"
            weight = 2.0
            scope = "title"

            [[keyword]]
            pattern = "inflation"
            weight = 1.0
            scope = "description"
        "#;
        let lex: Lexicon = toml::from_str(toml).unwrap();
        let lex = lex.folded();
        assert_eq!(lex.threshold, 2.0);
        assert_eq!(lex.keywords.len(), 2);
        assert_eq!(lex.keywords[0].pattern, "fed");
        assert_eq!(lex.keywords[0].scope, FieldScope::Title);
        assert_eq!(lex.exclusions, vec!["airdrop".to_string()]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let lex: Lexicon = toml::from_str("threshold = 1.5").unwrap();
        assert!(lex.keywords.is_empty());
        assert!(lex.exclusions.is_empty());
    }
}
