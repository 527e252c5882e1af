// src/rewrite.rs
//! Rewrite collaborator: turns a claimed story into a bilingual blog
//! bundle. The queue state machine only sees the trait and the three-way
//! error split; provider choice is env-driven.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::RewriteError;
use crate::model::{BilingualContent, ClaimedStory};

pub const ENV_PROVIDER: &str = "AI_PROVIDER";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_KEY: &str = "ANTHROPIC_API_KEY";

const OPENAI_MODEL: &str = "gpt-4o-mini";
const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const PROMPT_CONTENT_CAP: usize = 2000;

#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, story: &ClaimedStory) -> Result<BilingualContent, RewriteError>;
    fn provider_name(&self) -> &'static str;
}

/// Build the provider selected by environment: `AI_PROVIDER=anthropic` with
/// a key wins, then OpenAI with a key; neither configured is a hard error
/// (the `process` subcommand cannot run without one).
pub fn build_rewriter(http_timeout: Duration) -> anyhow::Result<Box<dyn Rewriter>> {
    let provider = std::env::var(ENV_PROVIDER).unwrap_or_default();
    let anthropic_key = std::env::var(ENV_ANTHROPIC_KEY).ok().filter(|k| !k.is_empty());
    let openai_key = std::env::var(ENV_OPENAI_KEY).ok().filter(|k| !k.is_empty());

    let client = reqwest::Client::builder().timeout(http_timeout).build()?;

    if provider.eq_ignore_ascii_case("anthropic") {
        if let Some(key) = anthropic_key {
            return Ok(Box::new(AnthropicRewriter { client, api_key: key }));
        }
    }
    if let Some(key) = openai_key {
        return Ok(Box::new(OpenAiRewriter { client, api_key: key }));
    }
    anyhow::bail!("no rewrite provider configured: set OPENAI_API_KEY or ANTHROPIC_API_KEY")
}

// The blog is PT-BR first with an EN mirror, so the editorial instructions
// stay in Portuguese and demand both languages in one JSON bundle.
fn build_prompt(story: &ClaimedStory) -> String {
    let mut content = story.description.clone();
    if content.chars().count() > PROMPT_CONTENT_CAP {
        content = content.chars().take(PROMPT_CONTENT_CAP).collect();
    }
    format!(
        r#"Você é um jornalista especializado em economia e criptomoedas.
Reescreva a notícia abaixo como um artigo de blog profissional.

NOTÍCIA ORIGINAL:
Título: {title}
Fonte: {source}
Conteúdo: {content}

INSTRUÇÕES:
1. Reescreva completamente com suas próprias palavras
2. Mantenha os fatos e dados importantes
3. Tom profissional mas acessível
4. Crie um título atrativo e um resumo de 2-3 frases

RESPONDA APENAS EM JSON:
{{
    "title_pt": "título em português",
    "content_pt": "conteúdo completo em português (3-5 parágrafos)",
    "summary_pt": "resumo em português",
    "title_en": "title in English",
    "content_en": "full content in English (3-5 paragraphs)",
    "summary_en": "summary in English",
    "tags": ["tag1", "tag2", "tag3"]
}}"#,
        title = story.title,
        source = story.source_id,
        content = content,
    )
}

fn map_transport_error(e: reqwest::Error) -> RewriteError {
    if e.is_timeout() {
        RewriteError::Timeout
    } else {
        RewriteError::InvalidResponse(e.to_string())
    }
}

fn parse_bundle(text: &str) -> Result<BilingualContent, RewriteError> {
    let bundle: BilingualContent = serde_json::from_str(text)
        .map_err(|e| RewriteError::InvalidResponse(format!("bad rewrite json: {e}")))?;
    if bundle.title_pt.trim().is_empty()
        || bundle.content_pt.trim().is_empty()
        || bundle.title_en.trim().is_empty()
        || bundle.content_en.trim().is_empty()
    {
        return Err(RewriteError::InvalidResponse(
            "rewrite json missing required fields".into(),
        ));
    }
    Ok(bundle)
}

pub struct OpenAiRewriter {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl Rewriter for OpenAiRewriter {
    async fn rewrite(&self, story: &ClaimedStory) -> Result<BilingualContent, RewriteError> {
        let body = json!({
            "model": OPENAI_MODEL,
            "messages": [{"role": "user", "content": build_prompt(story)}],
            "temperature": 0.7,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(RewriteError::QuotaExceeded);
        }
        if !resp.status().is_success() {
            return Err(RewriteError::InvalidResponse(format!(
                "openai status {}",
                resp.status()
            )));
        }

        let payload: Value = resp.json().await.map_err(map_transport_error)?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| RewriteError::InvalidResponse("openai reply missing content".into()))?;
        parse_bundle(text)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

pub struct AnthropicRewriter {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl Rewriter for AnthropicRewriter {
    async fn rewrite(&self, story: &ClaimedStory) -> Result<BilingualContent, RewriteError> {
        let body = json!({
            "model": ANTHROPIC_MODEL,
            "max_tokens": 2000,
            "messages": [{"role": "user", "content": build_prompt(story)}],
        });

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(RewriteError::QuotaExceeded);
        }
        if !resp.status().is_success() {
            return Err(RewriteError::InvalidResponse(format!(
                "anthropic status {}",
                resp.status()
            )));
        }

        let payload: Value = resp.json().await.map_err(map_transport_error)?;
        let text = payload["content"][0]["text"]
            .as_str()
            .ok_or_else(|| RewriteError::InvalidResponse("anthropic reply missing text".into()))?;

        // The model wraps the JSON in prose now and then; take the outermost
        // object.
        static RE_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());
        let json_text = RE_JSON
            .find(text)
            .map(|m| m.as_str())
            .ok_or_else(|| RewriteError::InvalidResponse("no json object in reply".into()))?;
        parse_bundle(json_text)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> ClaimedStory {
        ClaimedStory {
            fingerprint: "abcd".into(),
            attempts: 0,
            source_id: "coindesk".into(),
            category: "crypto".into(),
            title: "Bitcoin tops new record".into(),
            description: "Markets rally.".into(),
            url: None,
        }
    }

    #[test]
    fn prompt_includes_story_fields() {
        let p = build_prompt(&story());
        assert!(p.contains("Bitcoin tops new record"));
        assert!(p.contains("coindesk"));
        assert!(p.contains("title_pt"));
    }

    #[test]
    fn parse_bundle_accepts_complete_json() {
        let text = r#"{
            "title_pt": "t", "content_pt": "c", "summary_pt": "s",
            "title_en": "t", "content_en": "c", "summary_en": "s",
            "tags": ["btc"]
        }"#;
        let b = parse_bundle(text).unwrap();
        assert_eq!(b.tags, vec!["btc".to_string()]);
    }

    #[test]
    fn parse_bundle_rejects_empty_required_fields() {
        let text = r#"{
            "title_pt": " ", "content_pt": "c", "summary_pt": "s",
            "title_en": "t", "content_en": "c", "summary_en": "s"
        }"#;
        assert!(matches!(
            parse_bundle(text),
            Err(RewriteError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_bundle_rejects_malformed_json() {
        assert!(matches!(
            parse_bundle("not json"),
            Err(RewriteError::InvalidResponse(_))
        ));
    }
}
