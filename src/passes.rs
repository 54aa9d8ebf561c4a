//! The passes the CLI runs: scout accelerators, enumerate their
//! startups, write value propositions, and re-check pending rows.
//! Every pass reloads its dedup state from the store first, so an
//! interrupted run picks up where it stopped.

use std::collections::HashSet;

use anyhow::Result;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Pacing;
use crate::error::ScoutError;
use crate::extract::{self, RawStartup};
use crate::llm::{decode_items, decode_reply, Llm};
use crate::probe::{fetch_content, is_reachable, Fetcher, StatusBand};
use crate::reconcile::{reconcile, Candidate, DedupState, Origin, Outcome, Skip};
use crate::store::{AcceleratorRow, EntityKind, StartupRow, Store, Verified};
use crate::text::{normalize_name, normalize_url};

/// How `startups` finds candidates for a verified accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Ask the model which startups it already knows the accelerator backed.
    Knowledge,
    /// Locate the accelerator's portfolio page and read it.
    Scrape,
}

#[derive(Debug, Default)]
pub struct ScoutSummary {
    pub added: usize,
    pub corrected: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ScoutSummary {
    pub fn print(&self) {
        println!(
            "Done: {} added, {} corrected, {} skipped, {} errors.",
            self.added, self.corrected, self.skipped, self.errors
        );
    }
}

#[derive(Debug, Default)]
pub struct StartupSummary {
    pub processed: usize,
    pub already_done: usize,
    pub scrape_failed: usize,
    pub added: usize,
    pub corrected: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl StartupSummary {
    pub fn print(&self) {
        println!("Accelerators processed: {}", self.processed);
        println!("Already done:           {}", self.already_done);
        println!("Scrape failed:          {}", self.scrape_failed);
        println!("Startups added:         {}", self.added);
        println!("URLs corrected:         {}", self.corrected);
        println!("Duplicates skipped:     {}", self.skipped);
        println!("Errors:                 {}", self.errors);
    }

    fn absorb(&mut self, batch: BatchCounts) {
        self.added += batch.added;
        self.corrected += batch.corrected;
        self.skipped += batch.skipped;
    }
}

/// What one accelerator's batch contributed.
#[derive(Debug, Default)]
struct BatchCounts {
    added: usize,
    corrected: usize,
    skipped: usize,
}

#[derive(Debug, Default)]
pub struct PropositionSummary {
    pub generated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl PropositionSummary {
    pub fn print(&self) {
        println!(
            "Done: {} generated, {} skipped, {} errors.",
            self.generated, self.skipped, self.errors
        );
    }
}

#[derive(Debug, Default)]
pub struct VerifySummary {
    pub checked: usize,
    pub confirmed: usize,
    pub failed: usize,
}

impl VerifySummary {
    pub fn print(&self) {
        println!(
            "Done: {} checked, {} confirmed, {} still unreachable.",
            self.checked, self.confirmed, self.failed
        );
    }
}

#[derive(Debug, Deserialize)]
struct AcceleratorDetails {
    website: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct PropositionReply {
    value_proposition: String,
    #[serde(default)]
    source: String,
}

/// Ask the model for European accelerator names, then a website and
/// country for each, and admit whatever survives reconciliation.
pub async fn scout_accelerators(
    store: &dyn Store,
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    count: usize,
    pacing: &Pacing,
) -> Result<ScoutSummary> {
    let existing = store.accelerators()?;
    let mut state =
        DedupState::from_pairs(existing.iter().map(|r| (r.website.as_str(), r.name.as_str())));

    let names_prompt = format!(
        "Give me a list of {count} real startup accelerators that are BASED IN EUROPE. \
         Only include accelerators with headquarters in European countries like UK, Germany, France, Netherlands, Spain, Italy, Sweden, Denmark, Finland, Norway, Switzerland, Belgium, Ireland, Portugal, Austria, Poland, etc. \
         Do NOT include US-based accelerators like Y Combinator, 500 Startups, Techstars (US), Plug and Play, etc. \
         Return ONLY the names, no websites. \
         Return as JSON array of strings. \
         Format: [\"Name 1\", \"Name 2\", \"Name 3\"] \
         Only include well-known, established European accelerators."
    );
    let reply = llm
        .complete(&names_prompt)
        .await
        .ok_or(ScoutError::NoDiscoveryReply)?;
    let (names, malformed) = decode_items::<String>(&reply);
    if names.is_empty() && malformed > 0 {
        return Err(ScoutError::DiscoveryParse.into());
    }
    info!("model proposed {} accelerator names", names.len());

    let mut summary = ScoutSummary::default();
    for name in names {
        if state.knows_name(&normalize_name(&name)) {
            debug!("skipping duplicate name: {name}");
            summary.skipped += 1;
            continue;
        }
        info!("looking up: {name}");

        let details_prompt = format!(
            "For the startup accelerator \"{name}\", provide: \
             1. Their official website URL \
             2. The country where they are HEADQUARTERED \
             Return ONLY JSON format: {{\"website\": \"https://...\", \"country\": \"Country\"}} \
             Make sure the website is the real official website. \
             The country must be in Europe."
        );
        let Some(details_reply) = llm.complete(&details_prompt).await else {
            warn!("no details for {name}");
            summary.errors += 1;
            continue;
        };
        let Some(details) = decode_reply::<AcceleratorDetails>(&details_reply) else {
            warn!("unreadable details for {name}");
            summary.errors += 1;
            continue;
        };

        let candidate = Candidate {
            name,
            website: details.website,
            country: details.country,
        };
        let outcome = reconcile(
            llm,
            fetcher,
            &mut state,
            EntityKind::Accelerator,
            Origin::Model,
            &candidate,
        )
        .await;
        match outcome {
            Outcome::Accepted(accepted) => {
                if accepted.corrected() {
                    summary.corrected += 1;
                }
                info!(
                    "adding {} ({}) verified={}",
                    accepted.name,
                    accepted.website,
                    accepted.verified.as_cell()
                );
                store.append_accelerator(&AcceleratorRow {
                    website: accepted.website,
                    name: accepted.name,
                    country: accepted.country,
                    verified: accepted.verified,
                    source: accepted.source.as_cell().to_string(),
                })?;
                summary.added += 1;
                tokio::time::sleep(pacing.batch).await;
            }
            Outcome::Skipped(skip) => {
                debug!("skipped {}: {skip:?}", candidate.name);
                if !matches!(skip, Skip::Malformed) {
                    summary.skipped += 1;
                }
            }
        }
    }
    Ok(summary)
}

/// Enumerate startups for every verified accelerator that has none yet.
pub async fn find_startups(
    store: &dyn Store,
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    strategy: Strategy,
    pacing: &Pacing,
) -> Result<StartupSummary> {
    let accelerators = store.accelerators()?;
    let startups = store.startups()?;
    let done = accelerators_with_startups(&startups);
    let mut state =
        DedupState::from_pairs(startups.iter().map(|r| (r.website.as_str(), r.name.as_str())));

    let mut summary = StartupSummary::default();
    for acc in &accelerators {
        if acc.website.trim().is_empty() {
            continue;
        }
        if acc.verified != Verified::Yes {
            debug!("skipping unverified accelerator: {}", acc.name);
            continue;
        }
        if done.contains(&normalize_url(&acc.website)) {
            debug!("already processed: {}", acc.name);
            summary.already_done += 1;
            continue;
        }
        info!("finding startups from: {}", acc.name);

        match strategy {
            Strategy::Knowledge => {
                let Some(reply) = llm.complete(&knowledge_prompt(&acc.name)).await else {
                    warn!("no reply for {}", acc.name);
                    summary.errors += 1;
                    continue;
                };
                let (found, malformed) = decode_items::<RawStartup>(&reply);
                if found.is_empty() && malformed > 0 {
                    warn!("unreadable reply for {}", acc.name);
                    summary.errors += 1;
                    continue;
                }
                let counts =
                    admit_batch(store, llm, fetcher, &mut state, acc, found, None).await?;
                summary.absorb(counts);
                summary.processed += 1;
                tokio::time::sleep(pacing.batch).await;
            }
            Strategy::Scrape => {
                let Some(page_url) =
                    extract::find_portfolio_page(llm, fetcher, &acc.website, &acc.name, pacing)
                        .await
                else {
                    info!("no portfolio page found for {}", acc.name);
                    summary.scrape_failed += 1;
                    continue;
                };
                let found = match fetch_content(fetcher, &page_url).await {
                    Some(content) => {
                        let from_page =
                            extract::extract_from_html(llm, &content, &acc.name).await;
                        if from_page.is_empty() {
                            info!(
                                "page extraction came up empty for {}, asking the model instead",
                                acc.name
                            );
                            extract::extract_from_knowledge(llm, &acc.name, &page_url).await
                        } else {
                            from_page
                        }
                    }
                    None => {
                        info!("could not fetch {page_url}, asking the model instead");
                        extract::extract_from_knowledge(llm, &acc.name, &page_url).await
                    }
                };
                if found.is_empty() {
                    info!("no startups found for {}", acc.name);
                    summary.scrape_failed += 1;
                    continue;
                }
                info!("found {} candidates for {}", found.len(), acc.name);
                let counts =
                    admit_batch(store, llm, fetcher, &mut state, acc, found, Some(&page_url))
                        .await?;
                summary.absorb(counts);
                summary.processed += 1;
                tokio::time::sleep(pacing.scrape).await;
            }
        }
    }
    Ok(summary)
}

fn knowledge_prompt(accelerator_name: &str) -> String {
    format!(
        "Find 3 startups that graduated from or were part of the accelerator \"{accelerator_name}\". \
         IMPORTANT: Only include startups that are HEADQUARTERED IN EUROPE. \
         Do NOT include startups from USA, Africa, Asia, or other non-European regions. \
         European countries include: UK, France, Germany, Spain, Italy, Netherlands, Sweden, Denmark, Finland, Norway, Switzerland, Belgium, Ireland, Portugal, Austria, Poland, etc. \
         For each startup provide: \
         1. website (official website URL) \
         2. name (startup name) \
         3. country (must be a European country) \
         4. proof (brief explanation of how you know they are connected to this accelerator) \
         Return ONLY JSON array. \
         Format: [{{\"website\": \"https://...\", \"name\": \"Name\", \"country\": \"France\", \"proof\": \"Listed on accelerator website\"}}] \
         Only include European startups you are confident about. If none found, return: []"
    )
}

/// Run every candidate from one accelerator through reconciliation and
/// append the survivors. `scraped_from` carries the portfolio URL when
/// the batch came off a page, which also decides proof and source.
async fn admit_batch(
    store: &dyn Store,
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    state: &mut DedupState,
    accelerator: &AcceleratorRow,
    found: Vec<RawStartup>,
    scraped_from: Option<&str>,
) -> Result<BatchCounts> {
    let origin = if scraped_from.is_some() {
        Origin::Scraped
    } else {
        Origin::Model
    };
    let mut counts = BatchCounts::default();
    for raw in found {
        let RawStartup {
            name,
            website,
            country,
            proof,
        } = raw;
        let proof = match scraped_from {
            Some(url) => format!("Scraped from portfolio page: {url}"),
            None if proof.trim().is_empty() => "No proof provided".to_string(),
            None => proof,
        };
        let candidate = Candidate {
            name,
            website,
            country,
        };
        let outcome =
            reconcile(llm, fetcher, state, EntityKind::Startup, origin, &candidate).await;
        match outcome {
            Outcome::Accepted(accepted) => {
                if accepted.corrected() {
                    counts.corrected += 1;
                }
                info!(
                    "adding startup {} ({}) verified={}",
                    accepted.name,
                    accepted.website,
                    accepted.verified.as_cell()
                );
                store.append_startup(&StartupRow {
                    website: accepted.website,
                    name: accepted.name,
                    country: accepted.country,
                    accelerator_website: accelerator.website.clone(),
                    value_proposition: String::new(),
                    verified: accepted.verified,
                    relationship_proof: proof,
                    value_source: String::new(),
                })?;
                counts.added += 1;
            }
            Outcome::Skipped(Skip::Malformed) => {}
            Outcome::Skipped(skip) => {
                debug!("skipped {}: {skip:?}", candidate.name);
                counts.skipped += 1;
            }
        }
    }
    Ok(counts)
}

/// Accelerators that already have at least one startup row, keyed by
/// normalized URL. Resumability hinges on this set.
pub fn accelerators_with_startups(startups: &[StartupRow]) -> HashSet<String> {
    startups
        .iter()
        .map(|row| normalize_url(&row.accelerator_website))
        .filter(|url| !url.is_empty())
        .collect()
}

/// Fill in one-line value propositions for startups that have none.
/// Rows that failed verification are left alone.
pub async fn generate_value_propositions(
    store: &dyn Store,
    llm: &dyn Llm,
    pacing: &Pacing,
) -> Result<PropositionSummary> {
    let rows = store.startups()?;
    let mut summary = PropositionSummary::default();
    let pb = progress_bar(rows.len() as u64);
    for row in &rows {
        pb.inc(1);
        if !row.value_proposition.trim().is_empty() {
            summary.skipped += 1;
            continue;
        }
        if row.website.trim().is_empty() || row.name.trim().is_empty() {
            continue;
        }
        if row.verified == Verified::No {
            debug!("skipping unverified startup: {}", row.name);
            summary.skipped += 1;
            continue;
        }

        let prompt = format!(
            "For the startup \"{name}\" (website: {website}), provide: \
             1. A value proposition in this exact format: \"{name} helps [target customers] do [what they do] so that [benefit].\" \
             2. The source of your information (what you based this on) \
             Return ONLY JSON format: \
             {{\"value_proposition\": \"{name} helps...\", \"source\": \"Based on homepage description: ...\"}}\
             Keep value proposition to one sentence. \
             For source, briefly explain what information you used.",
            name = row.name,
            website = row.website,
        );
        let Some(reply) = llm.complete(&prompt).await else {
            warn!("no reply for {}", row.name);
            summary.errors += 1;
            continue;
        };
        let Some(decoded) = decode_reply::<PropositionReply>(&reply) else {
            warn!("unreadable reply for {}", row.name);
            summary.errors += 1;
            continue;
        };

        let proposition = trim_wrapping_quotes(&decoded.value_proposition);
        let source = if decoded.source.trim().is_empty() {
            "No source provided"
        } else {
            decoded.source.as_str()
        };
        store.set_value_proposition(&row.website, proposition, source)?;
        summary.generated += 1;
        debug!("generated for {}: {proposition}", row.name);
        tokio::time::sleep(pacing.entity).await;
    }
    pb.finish_and_clear();
    Ok(summary)
}

/// Models like to return the proposition wrapped in literal quotes.
fn trim_wrapping_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Re-probe accelerators still awaiting a verdict and record one.
pub async fn verify_accelerators(
    store: &dyn Store,
    fetcher: &dyn Fetcher,
    pacing: &Pacing,
) -> Result<VerifySummary> {
    let rows = store.accelerators()?;
    let pending: Vec<(String, String)> = rows
        .iter()
        .filter(|r| r.verified == Verified::Pending && !r.website.trim().is_empty())
        .map(|r| (r.website.clone(), r.name.clone()))
        .collect();
    sweep(fetcher, pending, pacing, |website, verified| {
        store.set_accelerator_verified(website, verified)
    })
    .await
}

/// Re-probe startups still awaiting a verdict and record one.
pub async fn verify_startups(
    store: &dyn Store,
    fetcher: &dyn Fetcher,
    pacing: &Pacing,
) -> Result<VerifySummary> {
    let rows = store.startups()?;
    let pending: Vec<(String, String)> = rows
        .iter()
        .filter(|r| r.verified == Verified::Pending && !r.website.trim().is_empty())
        .map(|r| (r.website.clone(), r.name.clone()))
        .collect();
    sweep(fetcher, pending, pacing, |website, verified| {
        store.set_startup_verified(website, verified)
    })
    .await
}

/// Probe each pending row and write the verdict back through `mark`.
/// Rows already marked yes or no are never touched again.
async fn sweep(
    fetcher: &dyn Fetcher,
    rows: Vec<(String, String)>,
    pacing: &Pacing,
    mut mark: impl FnMut(&str, Verified) -> Result<()>,
) -> Result<VerifySummary> {
    let mut summary = VerifySummary::default();
    let pb = progress_bar(rows.len() as u64);
    for (website, name) in &rows {
        pb.inc(1);
        let reachable =
            is_reachable(fetcher, &normalize_url(website), StatusBand::Confirmed).await;
        if reachable {
            summary.confirmed += 1;
        } else {
            info!("still unreachable: {name} ({website})");
            summary.failed += 1;
        }
        let verified = if reachable { Verified::Yes } else { Verified::No };
        mark(website, verified)?;
        summary.checked += 1;
        tokio::time::sleep(pacing.entity).await;
    }
    pb.finish_and_clear();
    Ok(summary)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}
