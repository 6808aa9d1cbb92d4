// src/content.rs
//! Content reconciliation: merge the plain-text and HTML parts of a message
//! into one best-effort body, then strip reply quoting. Newsletters and
//! forwards often carry the real content only in the HTML part; short
//! plain-text parts with a rich HTML sibling are the common case.

use crate::config::PipelineConfig;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

fn re_skip_blocks() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|head)[^>]*>.*?</(script|style|head)>")
            .expect("skip-block regex")
    })
}

fn re_breaks() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"))
}

fn re_block_close() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</(p|div|h[1-6]|tr|table|ul|ol|blockquote)>").expect("block regex")
    })
}

fn re_list_item() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)<li[^>]*>").expect("li regex"))
}

fn re_img() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<img[^>]*>").expect("img regex"))
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"))
}

fn re_blank_runs() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank-run regex"))
}

/// Render HTML to plain text: images dropped, link text kept, paragraph and
/// list structure mapped to newlines, entities decoded.
pub fn html_to_text(html: &str) -> String {
    let mut out = re_skip_blocks().replace_all(html, "").to_string();
    out = re_img().replace_all(&out, "").to_string();
    out = re_breaks().replace_all(&out, "\n").to_string();
    out = re_list_item().replace_all(&out, "\n- ").to_string();
    out = re_block_close().replace_all(&out, "\n\n").to_string();
    // Anchor tags fall away here; their inner text survives.
    out = re_tags().replace_all(&out, "").to_string();
    out = html_escape::decode_html_entities(&out).to_string();

    // Tidy per line, keep the newline structure.
    let tidy: Vec<&str> = out.lines().map(str::trim_end).collect();
    let mut joined = tidy.join("\n");
    joined = re_blank_runs().replace_all(&joined, "\n\n").to_string();
    joined.trim().to_string()
}

/// Reconcile plain text with the HTML rendering. When the HTML text is much
/// longer (ratio threshold) it wins wholesale; otherwise the plain text is
/// the base and content-bearing HTML-only lines are appended.
pub fn reconcile(plain: &str, html: Option<&str>, cfg: &PipelineConfig) -> String {
    let html = match html {
        Some(h) if !h.trim().is_empty() => h,
        _ => return plain.to_string(),
    };
    let rendered = html_to_text(html);
    if rendered.is_empty() {
        return plain.to_string();
    }

    let plain_len = plain.chars().count() as f32;
    let rendered_len = rendered.chars().count() as f32;
    if rendered_len > plain_len * cfg.html_prefer_ratio {
        return rendered;
    }

    let known: HashSet<&str> = plain.lines().map(str::trim).collect();
    let mut out = plain.to_string();
    for line in rendered.lines() {
        let trimmed = line.trim();
        if trimmed.chars().count() > cfg.merge_line_min_chars && !known.contains(trimmed) {
            out.push('\n');
            out.push_str(trimmed);
        }
    }
    out
}

/// Drop quoted-reply lines (`>` prefix), collapse 3+ newlines to 2, trim.
/// Pure and deterministic; safe to run before or after URL extraction.
pub fn strip_quoted(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect();
    let joined = kept.join("\n");
    re_blank_runs()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn html_rendering_keeps_link_text_and_drops_images() {
        let html = r#"<p>Read <a href="https://x.example/a">the article</a> now.</p><img src="pixel.gif">"#;
        let out = html_to_text(html);
        assert_eq!(out, "Read the article now.");
    }

    #[test]
    fn html_rendering_preserves_list_structure_and_entities() {
        let html = "<ul><li>First &amp; foremost</li><li>Second</li></ul>";
        let out = html_to_text(html);
        assert_eq!(out, "- First & foremost\n- Second");
    }

    #[test]
    fn missing_html_passes_plain_text_through() {
        assert_eq!(reconcile("hello", None, &cfg()), "hello");
    }

    #[test]
    fn much_longer_html_wins_wholesale() {
        let plain = "short";
        let html = format!("<p>{}</p>", "long newsletter body ".repeat(10));
        let out = reconcile(plain, Some(&html), &cfg());
        assert!(out.starts_with("long newsletter body"));
        assert!(!out.contains("short"));
    }

    #[test]
    fn comparable_html_merges_only_new_long_lines() {
        let plain = "Shared line that both parts carry verbatim today\nAnother plain line";
        let html = "<p>Shared line that both parts carry verbatim today</p>\
                    <p>Fresh content only present in the HTML part</p>\
                    <p>tiny</p>";
        let out = reconcile(plain, Some(html), &cfg());
        assert!(out.starts_with(plain));
        assert!(out.contains("Fresh content only present in the HTML part"));
        // Short lines and already-known lines are not merged.
        assert!(!out.contains("tiny"));
        assert_eq!(out.matches("Shared line").count(), 1);
    }

    #[test]
    fn quoted_lines_are_stripped() {
        assert_eq!(strip_quoted("Hello\n> quoted\nBye"), "Hello\nBye");
    }

    #[test]
    fn blank_runs_collapse_to_two_newlines() {
        assert_eq!(strip_quoted("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn indented_quote_markers_also_strip() {
        assert_eq!(strip_quoted("keep\n  > nested quote\nkeep too"), "keep\nkeep too");
    }
}
