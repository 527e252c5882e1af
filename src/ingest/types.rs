// src/ingest/types.rs
use crate::error::FetchError;
use chrono::{DateTime, Utc};

/// One raw feed item before fingerprinting/scoring. Text fields arrive
/// already HTML-cleaned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub source_id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Feed transport boundary. The pipeline only sees candidate lists; how
/// they were fetched (HTTP, fixture, anything else) stays behind this trait.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>, FetchError>;
    fn source_id(&self) -> &str;
}
