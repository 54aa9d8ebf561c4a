//! Candidate admission. Every entity, model-proposed or scraped, goes
//! through the same gauntlet before it may touch the store: normalize,
//! gate on Europe, dedup against everything already known, then confirm
//! the URL actually answers (correcting it when it does not).

use std::collections::HashSet;

use tracing::{debug, info};

use crate::geography::{classify_european, lookup_country, Europe};
use crate::llm::Llm;
use crate::probe::{is_reachable, Fetcher, StatusBand};
use crate::resolve::resolve_url;
use crate::store::{EntityKind, Source, Verified};
use crate::text::{normalize_name, normalize_url};

/// How a candidate entered the pipeline; decides its provenance tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Model,
    Scraped,
}

impl Origin {
    fn source(self, corrected: bool) -> Source {
        match (self, corrected) {
            (Origin::Model, false) => Source::ModelGenerated,
            (Origin::Model, true) => Source::ModelCorrected,
            (Origin::Scraped, false) => Source::Scraped,
            (Origin::Scraped, true) => Source::ScrapedCorrected,
        }
    }
}

/// A raw mention of an entity, before any checks.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub website: String,
    pub country: String,
}

/// In-memory dedup view of one collection. Loaded once per pass from the
/// snapshot, then updated as rows are accepted so later candidates in
/// the same run see them without re-reading the store.
#[derive(Debug, Default)]
pub struct DedupState {
    websites: HashSet<String>,
    names: HashSet<String>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the (website, name) pairs of the current snapshot.
    /// Keys are normalized here, so callers pass raw cell values.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut state = Self::default();
        for (website, name) in pairs {
            let url = normalize_url(website);
            if !url.is_empty() {
                state.websites.insert(url);
            }
            let name = normalize_name(name);
            if !name.is_empty() {
                state.names.insert(name);
            }
        }
        state
    }

    pub fn knows_website(&self, normalized: &str) -> bool {
        self.websites.contains(normalized)
    }

    pub fn knows_name(&self, normalized: &str) -> bool {
        self.names.contains(normalized)
    }

    fn admit(&mut self, website: String, name: String) {
        self.websites.insert(website);
        self.names.insert(name);
    }
}

/// A candidate that survived, ready to persist.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub website: String,
    pub name: String,
    pub country: String,
    pub verified: Verified,
    pub source: Source,
}

impl Accepted {
    pub fn corrected(&self) -> bool {
        matches!(self.source, Source::ModelCorrected | Source::ScrapedCorrected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NonEuropean,
    Malformed,
    DuplicateWebsite,
    DuplicateName,
}

#[derive(Debug)]
pub enum Outcome {
    Accepted(Accepted),
    Skipped(Skip),
}

/// Run one candidate through the admission checks, in a fixed order:
/// geography before anything costs a probe, dedup before the network,
/// reachability last. An accepted candidate is immediately added to
/// `state` so it blocks its own duplicates within the run.
pub async fn reconcile(
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    state: &mut DedupState,
    kind: EntityKind,
    origin: Origin,
    candidate: &Candidate,
) -> Outcome {
    let website = normalize_url(&candidate.website);
    let name = candidate.name.trim();

    let mut country = candidate.country.trim().to_string();
    let mut verdict = classify_european(&country);
    if verdict == Europe::Unknown {
        debug!("country unknown for {name}, asking the model");
        country = lookup_country(llm, name, &website, kind).await;
        verdict = classify_european(&country);
    }
    if verdict != Europe::Yes {
        debug!("skipping non-European {}: {name} ({country})", kind.noun());
        return Outcome::Skipped(Skip::NonEuropean);
    }

    if website.is_empty() || name.is_empty() {
        debug!("dropping malformed candidate: name={name:?} website={website:?}");
        return Outcome::Skipped(Skip::Malformed);
    }

    if state.knows_website(&website) {
        debug!("duplicate website: {website}");
        return Outcome::Skipped(Skip::DuplicateWebsite);
    }
    if state.knows_name(&normalize_name(name)) {
        debug!("duplicate name: {name}");
        return Outcome::Skipped(Skip::DuplicateName);
    }

    let mut website = website;
    let mut corrected = false;
    let verified = if is_reachable(fetcher, &website, StatusBand::Exists).await {
        Verified::Yes
    } else {
        info!("URL does not answer for {name}, searching for the right one");
        match resolve_url(llm, fetcher, name, kind).await {
            Some(found) if state.knows_website(&found) => {
                debug!("corrected URL already present: {found}");
                return Outcome::Skipped(Skip::DuplicateWebsite);
            }
            Some(found) => {
                website = found;
                corrected = true;
                Verified::Yes
            }
            None => Verified::No,
        }
    };

    state.admit(website.clone(), normalize_name(name));
    Outcome::Accepted(Accepted {
        website,
        name: name.to_string(),
        country,
        verified,
        source: origin.source(corrected),
    })
}
