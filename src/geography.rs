//! The Europe gate. Candidates from outside Europe never reach the store,
//! so this check runs before any probing or persistence.

use tracing::debug;

use crate::llm::Llm;
use crate::store::EntityKind;

/// Verdict of the gazetteer check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Europe {
    Yes,
    No,
    Unknown,
}

/// Country names and aliases matched by substring, so longer location
/// strings like "Paris, France" still hit their country entry.
const EUROPEAN_COUNTRIES: &[&str] = &[
    "albania",
    "andorra",
    "austria",
    "belarus",
    "belgium",
    "bosnia",
    "bosnia and herzegovina",
    "bulgaria",
    "croatia",
    "cyprus",
    "czech republic",
    "czechia",
    "denmark",
    "estonia",
    "finland",
    "france",
    "germany",
    "greece",
    "hungary",
    "iceland",
    "ireland",
    "italy",
    "kosovo",
    "latvia",
    "liechtenstein",
    "lithuania",
    "luxembourg",
    "malta",
    "moldova",
    "monaco",
    "montenegro",
    "netherlands",
    "north macedonia",
    "norway",
    "poland",
    "portugal",
    "romania",
    "russia",
    "san marino",
    "serbia",
    "slovakia",
    "slovenia",
    "spain",
    "sweden",
    "switzerland",
    "ukraine",
    "united kingdom",
    "uk",
    "vatican",
    "vatican city",
];

/// Classify a country string. Empty or literal "Unknown" input is
/// `Unknown`; anything else is matched against the gazetteer.
pub fn classify_european(country: &str) -> Europe {
    let country = country.trim();
    if country.is_empty() || country == "Unknown" {
        return Europe::Unknown;
    }
    let lower = country.to_lowercase();
    if EUROPEAN_COUNTRIES.iter().any(|c| lower.contains(c)) {
        Europe::Yes
    } else {
        Europe::No
    }
}

/// Secondary lookup for entities whose country the caller does not know.
/// Returns "Unknown" when the model has no answer or the call fails.
pub async fn lookup_country(
    llm: &dyn Llm,
    name: &str,
    website: &str,
    kind: EntityKind,
) -> String {
    let prompt = format!(
        "Where is the {} \"{}\" (website: {}) headquartered? \
         Return ONLY the country name, nothing else. \
         Example: France \
         If you do not know, return: Unknown",
        kind.noun(),
        name,
        website
    );
    match llm.complete(&prompt).await {
        Some(reply) => {
            let country = reply.trim().to_string();
            if country.is_empty() {
                "Unknown".to_string()
            } else {
                country
            }
        }
        None => {
            debug!("country lookup failed for {name}");
            "Unknown".to_string()
        }
    }
}
