//! URL correction for entities whose recorded website failed its check:
//! ask the model for the official site first, then probe name-derived
//! guesses until one answers.

use tracing::{debug, info};

use crate::llm::Llm;
use crate::probe::{is_reachable, Fetcher, StatusBand};
use crate::store::EntityKind;
use crate::text::normalize_url;
use crate::variants::url_variants;

/// Find a working URL for `name`. `None` means every avenue failed and
/// the caller keeps what it has, unverified.
pub async fn resolve_url(
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    name: &str,
    kind: EntityKind,
) -> Option<String> {
    let prompt = format!(
        "The {} \"{}\" - I need their correct official website URL. \
         Search your knowledge carefully. \
         Return ONLY the URL, nothing else. \
         Format: https://example.com \
         If you are not sure, return: UNKNOWN",
        kind.noun(),
        name
    );
    if let Some(reply) = llm.complete(&prompt).await {
        let suggestion = reply.trim();
        if !suggestion.contains("UNKNOWN") {
            let url = normalize_url(suggestion);
            if is_reachable(fetcher, &url, StatusBand::Exists).await {
                info!("model knew the URL for {name}: {url}");
                return Some(url);
            }
            debug!("model suggestion for {name} did not answer: {url}");
        }
    }

    for candidate in url_variants(name) {
        debug!("trying variant: {candidate}");
        if is_reachable(fetcher, &candidate, StatusBand::Exists).await {
            info!("variant answered for {name}: {candidate}");
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeFetcher, FakeLlm};

    #[tokio::test]
    async fn model_suggestion_wins_when_reachable() {
        let llm = FakeLlm::new(|_| Some("https://fixed.com".to_string()));
        let fetcher = FakeFetcher::new().with_status("https://fixed.com", 200);
        let url = resolve_url(&llm, &fetcher, "Fixed", EntityKind::Startup).await;
        assert_eq!(url.as_deref(), Some("https://fixed.com"));
    }

    #[tokio::test]
    async fn suggestion_is_normalized_before_probing() {
        let llm = FakeLlm::new(|_| Some("  Fixed.com/  ".to_string()));
        let fetcher = FakeFetcher::new().with_status("https://fixed.com", 403);
        let url = resolve_url(&llm, &fetcher, "Fixed", EntityKind::Startup).await;
        assert_eq!(url.as_deref(), Some("https://fixed.com"));
    }

    #[tokio::test]
    async fn unknown_falls_back_to_variants_in_order() {
        let llm = FakeLlm::new(|_| Some("UNKNOWN".to_string()));
        // First variant missing, second answers.
        let fetcher = FakeFetcher::new().with_status("https://acme.com", 200);
        let url = resolve_url(&llm, &fetcher, "Acme", EntityKind::Startup).await;
        assert_eq!(url.as_deref(), Some("https://acme.com"));
        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0], "https://www.acme.com");
        assert_eq!(requests[1], "https://acme.com");
    }

    #[tokio::test]
    async fn dead_suggestion_still_tries_variants() {
        let llm = FakeLlm::new(|_| Some("https://wrong.example".to_string()));
        let fetcher = FakeFetcher::new().with_status("https://www.acme.com", 200);
        let url = resolve_url(&llm, &fetcher, "Acme", EntityKind::Startup).await;
        assert_eq!(url.as_deref(), Some("https://www.acme.com"));
    }

    #[tokio::test]
    async fn gives_up_when_nothing_answers() {
        let llm = FakeLlm::silent();
        let fetcher = FakeFetcher::new();
        assert!(resolve_url(&llm, &fetcher, "Ghost", EntityKind::Accelerator)
            .await
            .is_none());
    }
}
