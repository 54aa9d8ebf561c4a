//! Canned collaborators for tests: a scripted model and a scripted
//! fetcher, both recording what they were asked.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::llm::Llm;
use crate::probe::{FetchResponse, Fetcher};

/// Model double driven by a closure from prompt to reply. Prompts are
/// recorded in order for assertions.
pub struct FakeLlm {
    script: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(script: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Model that never answers.
    pub fn silent() -> Self {
        Self::new(|_| None)
    }

    /// Model that must not be consulted at all.
    pub fn unreachable() -> Self {
        Self::new(|prompt| panic!("unexpected model call: {prompt}"))
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for FakeLlm {
    async fn complete(&self, prompt: &str) -> Option<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.script)(prompt)
    }
}

/// Fetcher double with a fixed routing table. Unrouted URLs fail the
/// way a dead host would. Requests are recorded in order.
pub struct FakeFetcher {
    routes: HashMap<String, (u16, String)>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Route `url` to a bare status with an empty body.
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), (status, String::new()));
        self
    }

    /// Route `url` to a full response.
    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(url.to_string(), (status, body.to_string()));
        self
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some((status, body)) => Ok(FetchResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(anyhow!("no route to {url}")),
        }
    }
}
