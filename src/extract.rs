//! Portfolio-page extraction: find the page that lists an accelerator's
//! companies, cut the HTML down to something a model can read, and turn
//! the reply into candidate startups.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Pacing;
use crate::llm::{decode_items, Llm};
use crate::probe::{is_reachable, Fetcher, StatusBand};

/// Character budget for page content sent to the model.
const MAX_CONTENT_CHARS: usize = 30_000;
/// Hard cap on candidates taken from one page or knowledge reply.
const MAX_STARTUPS: usize = 5;

/// Paths where accelerators usually keep their portfolio listing,
/// probed in order after the model draws a blank.
const PORTFOLIO_PATHS: &[&str] = &[
    "/portfolio",
    "/companies",
    "/startups",
    "/our-portfolio",
    "/our-companies",
    "/our-startups",
    "/alumni",
    "/founders",
    "/investments",
    "/backed",
    "/network",
    "/community/companies",
    "/portfolio-companies",
    "/seed-portfolio",
    "/all-companies",
];

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").unwrap());
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// One candidate row as the model reports it. Name and website are
/// required; the rest defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStartup {
    pub name: String,
    pub website: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub proof: String,
}

/// Locate the page listing an accelerator's funded companies: the model
/// may know the exact URL, otherwise the usual paths get probed.
pub async fn find_portfolio_page(
    llm: &dyn Llm,
    fetcher: &dyn Fetcher,
    accelerator_url: &str,
    accelerator_name: &str,
    pacing: &Pacing,
) -> Option<String> {
    let prompt = format!(
        "What is the exact URL of the portfolio/companies page for the accelerator \"{accelerator_name}\"? \
         Their main website is: {accelerator_url} \
         I need the page that lists all their portfolio companies or startups. \
         Return ONLY the full URL, nothing else. \
         If you do not know the exact URL, return: UNKNOWN"
    );
    if let Some(reply) = llm.complete(&prompt).await {
        let url = reply.trim();
        if !url.contains("UNKNOWN")
            && url.starts_with("http")
            && is_reachable(fetcher, url, StatusBand::Confirmed).await
        {
            info!("model knew the portfolio page: {url}");
            return Some(url.to_string());
        }
    }

    debug!("probing common portfolio paths for {accelerator_name}");
    let base = accelerator_url.trim_end_matches('/');
    for path in PORTFOLIO_PATHS {
        let candidate = format!("{base}{path}");
        if is_reachable(fetcher, &candidate, StatusBand::Strict).await {
            info!("portfolio path answered: {candidate}");
            return Some(candidate);
        }
        tokio::time::sleep(pacing.probe).await;
    }
    None
}

/// Extract European startups from a portfolio page's HTML.
pub async fn extract_from_html(
    llm: &dyn Llm,
    page_content: &str,
    accelerator_name: &str,
) -> Vec<RawStartup> {
    let cleaned = clean_page(page_content);
    let windowed = window_content(&cleaned);
    debug!(
        "sending {} chars of portfolio content to the model",
        windowed.chars().count()
    );

    let prompt = format!(
        "I have HTML content from the portfolio page of accelerator \"{accelerator_name}\". \
         Extract startup company names from this page. \
         IMPORTANT: Only include startups that are based in EUROPEAN countries. \
         For each startup: \
         1. Find the company NAME \
         2. Find their ACTUAL website (NOT the accelerator page about them) \
            - If not visible, guess based on company name (e.g., \"Revolut\" -> \"https://revolut.com\") \
         3. Find their COUNTRY - must be in Europe (UK, France, Germany, Spain, Netherlands, etc.) \
            - Skip any startups from USA, Africa, Asia, etc. \
         IMPORTANT: Do NOT return URLs that contain \"{accelerator_slug}\". \
         Return ONLY JSON array: [{{\"name\": \"Company\", \"website\": \"https://company.com\", \"country\": \"France\"}}] \
         Return maximum {MAX_STARTUPS} EUROPEAN startups only. If none found, return: [] \
         \n\nHTML:\n{windowed}",
        accelerator_slug = accelerator_name.to_lowercase()
    );

    let Some(reply) = llm.complete(&prompt).await else {
        return Vec::new();
    };
    let (mut startups, malformed) = decode_items::<RawStartup>(&reply);
    if malformed > 0 {
        debug!("dropped {malformed} malformed items from page extraction");
    }
    startups.truncate(MAX_STARTUPS);
    startups
}

/// Fallback when the portfolio page cannot be fetched or read: ask the
/// model for companies it already knows this accelerator funded.
pub async fn extract_from_knowledge(
    llm: &dyn Llm,
    accelerator_name: &str,
    portfolio_url: &str,
) -> Vec<RawStartup> {
    let prompt = format!(
        "The accelerator \"{accelerator_name}\" has their portfolio at: {portfolio_url} \
         Based on your knowledge, list {MAX_STARTUPS} EUROPEAN startups from their portfolio. \
         IMPORTANT: Only include startups headquartered in European countries (UK, France, Germany, Spain, Netherlands, Sweden, etc.) \
         Do NOT include startups from USA, Africa, Asia, or other non-European regions. \
         For each startup provide: \
         1. name - the startup company name \
         2. website - the startup ACTUAL website (like revolut.com), NOT the accelerator page \
         3. country - must be a European country \
         Return ONLY JSON array: [{{\"name\": \"Name\", \"website\": \"https://startup.com\", \"country\": \"France\"}}] \
         Only include startups you are confident are European companies."
    );

    let Some(reply) = llm.complete(&prompt).await else {
        return Vec::new();
    };
    let (mut startups, malformed) = decode_items::<RawStartup>(&reply);
    if malformed > 0 {
        debug!("dropped {malformed} malformed items from knowledge reply");
    }
    startups.truncate(MAX_STARTUPS);
    startups
}

/// Drop scripts, styles, comments and tags, then collapse whitespace.
/// What's left is the visible text plus link targets, which is what the
/// extraction prompt needs.
fn clean_page(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// Cut an oversized page down to the character budget. Listings rarely
/// sit at the very top, so the window starts at the first portfolio-ish
/// keyword when one fits, else 20% into the document.
fn window_content(content: &str) -> &str {
    let total = content.chars().count();
    if total <= MAX_CONTENT_CHARS {
        return content;
    }
    let start = match keyword_pos(content) {
        Some(pos) if content[pos..].chars().count() >= MAX_CONTENT_CHARS => pos,
        _ => byte_at_char(content, total / 5),
    };
    let end = start + byte_at_char(&content[start..], MAX_CONTENT_CHARS);
    &content[start..end]
}

/// Byte offset of the first occurrence of the highest-priority keyword
/// present anywhere in the text.
fn keyword_pos(content: &str) -> Option<usize> {
    static KEYWORDS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
        [
            Regex::new("(?i)portfolio").unwrap(),
            Regex::new("(?i)companies").unwrap(),
            Regex::new("(?i)startups").unwrap(),
        ]
    });
    KEYWORDS.iter().find_map(|re| re.find(content).map(|m| m.start()))
}

/// Byte offset of the `n`-th character, clamped to the end.
fn byte_at_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
