use thiserror::Error;

/// Conditions that abort a whole pass. Everything else is swallowed into
/// per-entity counters and the pass moves on.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("no API key configured - set OPENAI_API_KEY or SCOUT_API_KEY")]
    MissingApiKey,
    #[error("the model returned no accelerator list - check the API key and connectivity")]
    NoDiscoveryReply,
    #[error("the model's accelerator list was not valid JSON - rerun with RUST_LOG=debug to see the raw reply")]
    DiscoveryParse,
}
