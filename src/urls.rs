// src/urls.rs
//! URL discovery and canonicalization. Inbound mail URLs arrive mangled:
//! wrapped in markup, glued to punctuation, scheme duplicated by forwarding
//! chains, or bare `www.` tokens. Extraction unions three sources (plain
//! text, anchor hrefs, raw HTML tokens); normalization is a fixed-order
//! cleanup that either yields an absolute http(s) URL or drops the candidate.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

fn re_url() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("url regex")
    })
}

fn re_href() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("href regex")
    })
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"))
}

fn re_scheme() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)https?://").expect("scheme regex"))
}

/// Collect candidate URLs from the plain text and, when present, from the
/// HTML: every anchor href plus every URL-like token in the raw markup.
/// Candidates are normalized, filtered, and deduplicated preserving first
/// occurrence order.
pub fn extract_urls(text: &str, html: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    for m in re_url().find_iter(text) {
        candidates.push(m.as_str().to_string());
    }
    if let Some(html) = html {
        for caps in re_href().captures_iter(html) {
            candidates.push(caps[1].to_string());
        }
        for m in re_url().find_iter(html) {
            candidates.push(m.as_str().to_string());
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for raw in candidates {
        if let Some(url) = normalize_url(&raw) {
            if seen.insert(url.clone()) {
                out.push(url);
            }
        }
    }
    out
}

/// Canonicalize one candidate. Steps, in order:
/// 1. strip embedded HTML tags
/// 2. strip trailing closing punctuation (quotes, parens, brackets, `>`)
/// 3. prepend `http://` to scheme-less `www.` tokens
/// 4. repair a duplicated-protocol artifact (`scheme://host/scheme://...`)
///    by keeping the second occurrence onward
/// 5. truncate at the first remaining `<`
/// 6. strip trailing sentence punctuation
/// Returns `None` unless the result is an absolute http(s), non-mailto URL.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = re_tags().replace_all(raw.trim(), "").to_string();

    while matches!(
        url.chars().last(),
        Some('"' | '\'' | ')' | ']' | '}' | '>')
    ) {
        url.pop();
    }

    if url.to_ascii_lowercase().starts_with("www.") {
        url = format!("http://{url}");
    }

    // Forwarding chains produce `https://host/https://real-target/...`;
    // everything before the second scheme is wrapper noise.
    let scheme_starts: Vec<usize> = re_scheme().find_iter(&url).map(|m| m.start()).collect();
    if let Some(&second) = scheme_starts.get(1) {
        url = url[second..].to_string();
    }

    if let Some(lt) = url.find('<') {
        url.truncate(lt);
    }

    while matches!(url.chars().last(), Some(',' | '.' | ';' | ':' | '!' | '?')) {
        url.pop();
    }

    let lower = url.to_ascii_lowercase();
    if (lower.starts_with("http://") || lower.starts_with("https://"))
        && !lower.starts_with("mailto:")
    {
        Some(url)
    } else {
        None
    }
}
