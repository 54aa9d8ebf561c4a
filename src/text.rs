//! Small string helpers shared across passes.

/// Canonical form of a website URL, used as the dedup key everywhere:
/// trimmed, lowercased, no trailing slashes, scheme-prefixed. Purely
/// textual - no network, no URL parsing.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim().to_lowercase();
    if url.is_empty() {
        return String::new();
    }
    let url = url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Canonical form of an entity name, used only for duplicate comparison.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_scheme_and_lowercases() {
        assert_eq!(normalize_url("Example.com/"), "https://example.com");
    }

    #[test]
    fn keeps_existing_scheme() {
        assert_eq!(normalize_url("HTTP://Foo.com"), "http://foo.com");
        assert_eq!(normalize_url("https://foo.com"), "https://foo.com");
    }

    #[test]
    fn strips_all_trailing_slashes() {
        assert_eq!(normalize_url("a.com//"), "https://a.com");
        assert_eq!(normalize_url("https://a.com///"), "https://a.com");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize_url(""), "");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Example.com/",
            "a.com//",
            "https://a.com",
            "  HTTP://Foo.com/bar/  ",
            "www.site.io",
            "",
        ];
        for input in inputs {
            let once = normalize_url(input);
            assert_eq!(normalize_url(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn name_normalization() {
        assert_eq!(normalize_name("  Seedcamp  "), "seedcamp");
        assert_eq!(normalize_name("REVOLUT"), "revolut");
    }
}
