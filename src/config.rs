use std::time::Duration;

use ::config::{Config, Environment};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings, read from `SCOUT_*` environment variables with
/// defaults that work out of the box. The API key also honors the
/// conventional `OPENAI_API_KEY`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_db_path() -> String {
    "data/scout.sqlite".to_string()
}

fn default_api_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(Environment::with_prefix("SCOUT"))
            .build()
            .context("reading SCOUT_* environment")?;
        let mut settings: Settings = cfg
            .try_deserialize()
            .context("deserializing settings")?;
        if settings.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            settings.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty());
        }
        Ok(settings)
    }
}

/// Fixed pauses between outbound calls. The pipeline is deliberately
/// sequential, so these delays are the whole rate-limit story.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// After each row-level model or store write.
    pub entity: Duration,
    /// After each accelerator processed from model knowledge.
    pub batch: Duration,
    /// After each accelerator processed by scraping.
    pub scrape: Duration,
    /// Between blind portfolio-path probes.
    pub probe: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            entity: Duration::from_millis(500),
            batch: Duration::from_secs(1),
            scrape: Duration::from_secs(2),
            probe: Duration::from_millis(200),
        }
    }
}

impl Pacing {
    /// All-zero pacing for tests.
    pub fn none() -> Self {
        Self {
            entity: Duration::ZERO,
            batch: Duration::ZERO,
            scrape: Duration::ZERO,
            probe: Duration::ZERO,
        }
    }
}
