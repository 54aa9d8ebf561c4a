//! Homepage guessing for companies whose recorded URL is dead or missing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Corporate suffixes dropped before slugging the name.
static STRIP_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(accelerator|ventures|capital|labs|lab|fund|partners|inc|ltd|co|company)$")
        .unwrap()
});

/// Suffixes that double as real top-level domains (fund names love
/// `nexgen.ventures`-style sites).
static TLD_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(ventures|capital|labs|lab|fund|partners)$").unwrap()
});

/// Plausible homepage URLs for a company name, most likely first. The
/// list is deterministic and bounded so probing order is stable across
/// runs and the worst case stays cheap.
pub fn url_variants(company_name: &str) -> Vec<String> {
    let name = company_name.to_lowercase();
    let name = name.trim();
    let cleaned = STRIP_SUFFIX_RE.replace(name, "").trim().to_string();
    let suffix = TLD_SUFFIX_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase());

    let slug: String = cleaned.split_whitespace().collect();
    let dashed = cleaned.split_whitespace().collect::<Vec<_>>().join("-");

    let mut variants = vec![
        format!("https://www.{slug}.com"),
        format!("https://{slug}.com"),
        format!("https://www.{slug}.co"),
        format!("https://{slug}.co"),
        format!("https://www.{slug}.io"),
        format!("https://{slug}.io"),
        format!("https://www.{slug}.org"),
        format!("https://www.{slug}.ai"),
        format!("https://{slug}.ai"),
        format!("https://www.{dashed}.com"),
    ];

    if let Some(suffix) = &suffix {
        variants.push(format!("https://www.{slug}.{suffix}"));
        variants.push(format!("https://{slug}.{suffix}"));
        if let Some(first) = cleaned.split_whitespace().next() {
            variants.push(format!("https://www.{first}.{suffix}"));
            variants.push(format!("https://{first}.{suffix}"));
        }
    }

    // A suffix can collapse slug and first word into the same URL;
    // probing the same address twice is pure waste.
    let mut seen = HashSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_gets_the_base_list() {
        let vs = url_variants("Stripe");
        assert_eq!(vs[0], "https://www.stripe.com");
        assert_eq!(vs[1], "https://stripe.com");
        // Single word, so the dashed form collapses into the plain one.
        assert_eq!(vs.len(), 9);
    }

    #[test]
    fn two_words_keep_the_dashed_form() {
        let vs = url_variants("Tech Stars");
        assert_eq!(vs.len(), 10);
        assert_eq!(vs[9], "https://www.tech-stars.com");
    }

    #[test]
    fn ventures_suffix_becomes_a_tld() {
        let vs = url_variants("NexGen Ventures");
        assert!(vs.contains(&"https://www.nexgen.ventures".to_string()));
        assert!(vs.contains(&"https://nexgen.ventures".to_string()));
        // The word only ever appears as the top-level domain.
        assert!(vs
            .iter()
            .all(|v| !v.contains("ventures") || v.ends_with(".ventures")));
        assert!(vs.contains(&"https://www.nexgen.com".to_string()));
    }

    #[test]
    fn accelerator_suffix_is_stripped_but_not_a_tld() {
        let vs = url_variants("Acme Accelerator");
        assert!(vs.contains(&"https://www.acme.com".to_string()));
        assert!(vs.iter().all(|v| !v.ends_with(".accelerator")));
    }

    #[test]
    fn multiword_names_try_dashed_and_first_word_forms() {
        let vs = url_variants("Tech Stars Capital");
        assert!(vs.contains(&"https://www.techstars.com".to_string()));
        assert!(vs.contains(&"https://www.tech-stars.com".to_string()));
        assert!(vs.contains(&"https://techstars.capital".to_string()));
        assert!(vs.contains(&"https://tech.capital".to_string()));
    }

    #[test]
    fn deterministic_and_bounded() {
        let a = url_variants("NexGen Ventures");
        let b = url_variants("NexGen Ventures");
        assert_eq!(a, b);
        assert!(a.len() <= 14);
        let unique: HashSet<_> = a.iter().collect();
        assert_eq!(unique.len(), a.len());
    }
}
