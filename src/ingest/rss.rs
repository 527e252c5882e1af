// src/ingest/rss.rs
//! RSS 2.0 provider: one instance per catalog source. HTTP mode for real
//! runs, fixture mode for tests and offline development.

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::FetchError;
use crate::ingest::catalog::SourceSpec;
use crate::ingest::clean_text;
use crate::ingest::types::{RawCandidate, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_utc(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
}

pub struct RssProvider {
    spec: SourceSpec,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
    },
}

impl RssProvider {
    pub fn from_spec(spec: SourceSpec, client: reqwest::Client) -> Self {
        Self {
            spec,
            mode: Mode::Http { client },
        }
    }

    /// Parse a literal XML document instead of fetching. Used by tests and
    /// offline runs.
    pub fn from_fixture(spec: SourceSpec, xml: &str) -> Self {
        Self {
            spec,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<RawCandidate>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss =
            from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;

        if rss.channel.item.is_empty() {
            return Err(FetchError::EmptyFeed);
        }

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = clean_text(it.title.as_deref().unwrap_or_default());
            let description = clean_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && description.is_empty() {
                continue;
            }

            out.push(RawCandidate {
                source_id: self.spec.id.clone(),
                category: self.spec.category.clone(),
                title,
                description,
                url: it.link,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_utc),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),

            Mode::Http { client } => {
                let body = client
                    .get(&self.spec.url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn source_id(&self) -> &str {
        &self.spec.id
    }
}

// quick-xml only knows the XML built-ins; pre-scrub the HTML entities feeds
// love to embed.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SourceSpec {
        SourceSpec {
            id: "coindesk".into(),
            name: "CoinDesk".into(),
            url: "https://example.com/feed".into(),
            category: "crypto".into(),
            enabled: true,
        }
    }

    const FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>CoinDesk</title>
    <item>
      <title>Bitcoin tops &ldquo;new record&rdquo;</title>
      <link>https://example.com/btc</link>
      <pubDate>Tue, 05 Aug 2025 14:30:00 GMT</pubDate>
      <description>&lt;p&gt;Markets rally as&amp;nbsp;prices surge.&lt;/p&gt;</description>
    </item>
    <item>
      <title></title>
      <description></description>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn parses_fixture_and_skips_empty_items() {
        let provider = RssProvider::from_fixture(spec(), FIXTURE);
        let items = provider.fetch_latest().await.unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.source_id, "coindesk");
        assert_eq!(it.category, "crypto");
        assert_eq!(it.title, "Bitcoin tops \"new record\"");
        assert_eq!(it.description, "Markets rally as prices surge.");
        assert_eq!(it.url.as_deref(), Some("https://example.com/btc"));
        assert!(it.published_at.is_some());
    }

    #[tokio::test]
    async fn empty_channel_is_an_error() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        let provider = RssProvider::from_fixture(spec(), xml);
        let err = provider.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyFeed));
    }

    #[test]
    fn rfc2822_dates_parse_to_utc() {
        let dt = parse_rfc2822_to_utc("Tue, 05 Aug 2025 14:30:00 GMT").unwrap();
        assert_eq!(dt.timestamp(), 1_754_404_200);
        assert!(parse_rfc2822_to_utc("not a date").is_none());
    }
}
