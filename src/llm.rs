//! Chat-completions client and the decoding helpers for structured model
//! replies. The trait is the seam the tests script against.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::ScoutError;

const COMPLETIONS_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

#[async_trait]
pub trait Llm: Send + Sync {
    /// One prompt in, free text out. `None` covers transport failures and
    /// provider-reported errors alike; callers fall back or skip.
    async fn complete(&self, prompt: &str) -> Option<String>;
}

/// Client for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ScoutError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(COMPLETIONS_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl Llm for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Option<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let resp = match self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!("completion request failed: {err}");
                return None;
            }
        };

        // Error bodies are parsed rather than bailing on the HTTP status,
        // so the provider's own message reaches the log.
        let parsed: ChatResponse = match resp.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("completion response unreadable: {err}");
                return None;
            }
        };
        if let Some(api_err) = parsed.error {
            warn!("provider error: {}", api_err.message);
            return None;
        }
        parsed.choices.into_iter().next().map(|c| c.message.content)
    }
}

/// Strip one layer of markdown code fencing, with or without a `json`
/// language tag. Models add these no matter how firmly the prompt says
/// "ONLY JSON".
pub fn strip_code_fences(reply: &str) -> &str {
    let mut clean = reply.trim();
    if let Some(rest) = clean.strip_prefix("```json") {
        clean = rest;
    } else if let Some(rest) = clean.strip_prefix("```") {
        clean = rest;
    }
    if let Some(rest) = clean.strip_suffix("```") {
        clean = rest;
    }
    clean.trim()
}

/// Decode a structured reply into `T`. `None` on any parse failure; the
/// caller counts it and moves on.
pub fn decode_reply<T: DeserializeOwned>(reply: &str) -> Option<T> {
    let clean = strip_code_fences(reply);
    match serde_json::from_str(clean) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("undecodable model reply: {err}");
            None
        }
    }
}

/// Decode a JSON array element by element, salvaging the well-formed
/// items instead of discarding the whole batch over one bad entry.
/// Returns the items plus a malformed count (1 when the reply is not an
/// array at all).
pub fn decode_items<T: DeserializeOwned>(reply: &str) -> (Vec<T>, usize) {
    let values: Vec<serde_json::Value> = match decode_reply(reply) {
        Some(values) => values,
        None => return (Vec::new(), 1),
    };
    let mut items = Vec::new();
    let mut malformed = 0;
    for value in values {
        match serde_json::from_value(value) {
            Ok(item) => items.push(item),
            Err(err) => {
                debug!("skipping malformed item: {err}");
                malformed += 1;
            }
        }
    }
    (items, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Pair {
        name: String,
        website: String,
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("[1]"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn decodes_fenced_objects() {
        let reply = "```json\n{\"name\": \"Acme\", \"website\": \"https://acme.com\"}\n```";
        let pair: Pair = decode_reply(reply).unwrap();
        assert_eq!(pair.name, "Acme");
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert!(decode_reply::<Pair>("I could not find any data, sorry!").is_none());
    }

    #[test]
    fn arrays_salvage_good_items() {
        let reply = r#"[
            {"name": "Good", "website": "https://good.com"},
            {"website": 42},
            {"name": "Also Good", "website": "https://also.com"}
        ]"#;
        let (items, malformed) = decode_items::<Pair>(reply);
        assert_eq!(items.len(), 2);
        assert_eq!(malformed, 1);
        assert_eq!(items[0].name, "Good");
    }

    #[test]
    fn non_array_counts_as_one_failure() {
        let (items, malformed) = decode_items::<Pair>("no list here");
        assert!(items.is_empty());
        assert_eq!(malformed, 1);
    }
}
