// src/ingest/catalog.rs
//! Source catalog: the configured RSS feeds, grouped by category. Loaded
//! once per invocation; declaration order in the file is the ingest order.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";
pub const ENV_SOURCES_PATH: &str = "MACRONEWS_SOURCES_PATH";

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceSpec>,
}

impl Catalog {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source catalog from {}", path.display()))?;
        let catalog: Catalog = toml::from_str(&content)
            .with_context(|| format!("parsing source catalog {}", path.display()))?;
        Ok(catalog)
    }

    /// Load using env var + fallback:
    /// 1) $MACRONEWS_SOURCES_PATH
    /// 2) config/sources.toml
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_SOURCES_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOURCES_PATH));
        Self::load_from(&path)
    }

    /// Enabled sources, optionally restricted to one category, in
    /// declaration order.
    pub fn enabled(&self, category: Option<&str>) -> Vec<&SourceSpec> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| category.is_none_or(|c| s.category.eq_ignore_ascii_case(c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_filters_by_category() {
        let toml = r#"
            [[source]]
            id = "coindesk"
            name = "CoinDesk"
            url = "https://example.com/coindesk.rss"
            category = "crypto"

            [[source]]
            id = "fed-press"
            name = "Federal Reserve Press"
            url = "https://example.com/fed.rss"
            category = "macro"

            [[source]]
            id = "disabled-feed"
            name = "Disabled"
            url = "https://example.com/off.rss"
            category = "macro"
            enabled = false
        "#;
        let catalog: Catalog = toml::from_str(toml).unwrap();
        assert_eq!(catalog.sources.len(), 3);
        assert_eq!(catalog.enabled(None).len(), 2);
        let macro_only = catalog.enabled(Some("macro"));
        assert_eq!(macro_only.len(), 1);
        assert_eq!(macro_only[0].id, "fed-press");
    }
}
