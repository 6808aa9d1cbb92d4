// src/config.rs
//! Pipeline tuning knobs. Every heuristic threshold the quality gate and
//! reconciler rely on is a named field here, loadable from TOML with env
//! overrides, so the gate stays tunable and testable in isolation.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

// --- env defaults & names ---
pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";

pub const ENV_PIPELINE_CONFIG_PATH: &str = "SIGNAL_INBOX_CONFIG_PATH";
pub const ENV_SUMMARY_TRIGGER_CHARS: &str = "SIGNAL_INBOX_SUMMARY_TRIGGER_CHARS";

fn default_summary_trigger_chars() -> usize {
    1000
}
fn default_summary_excerpt_chars() -> usize {
    15000
}
fn default_summary_min_chars() -> usize {
    100
}
fn default_truncate_chars() -> usize {
    1500
}
fn default_truncation_marker() -> String {
    "... [truncated]".to_string()
}
fn default_html_prefer_ratio() -> f32 {
    1.5
}
fn default_merge_line_min_chars() -> usize {
    20
}
fn default_phrase_repeat_limit() -> usize {
    3
}
fn default_line_repeat_limit() -> usize {
    2
}
fn default_fragment_line_limit() -> usize {
    3
}
fn default_summarizer_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Content longer than this (chars) goes through the summarization gate.
    #[serde(default = "default_summary_trigger_chars")]
    pub summary_trigger_chars: usize,
    /// At most this many chars of cleaned content are sent to the summarizer.
    #[serde(default = "default_summary_excerpt_chars")]
    pub summary_excerpt_chars: usize,
    /// Summaries at or below this length are rejected by the gate.
    #[serde(default = "default_summary_min_chars")]
    pub summary_min_chars: usize,
    /// Fallback excerpt length when the summary is rejected or unavailable.
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,
    /// HTML-derived text wins outright when longer than plain text by this ratio.
    #[serde(default = "default_html_prefer_ratio")]
    pub html_prefer_ratio: f32,
    /// HTML-only lines shorter than this are not merged into the plain text.
    #[serde(default = "default_merge_line_min_chars")]
    pub merge_line_min_chars: usize,
    /// A 5-word phrase occurring more than this many times flags the text.
    #[serde(default = "default_phrase_repeat_limit")]
    pub phrase_repeat_limit: usize,
    /// A non-blank line occurring more than this many times flags the text.
    #[serde(default = "default_line_repeat_limit")]
    pub line_repeat_limit: usize,
    /// More than this many dangling-fragment lines flags the text.
    #[serde(default = "default_fragment_line_limit")]
    pub fragment_line_limit: usize,
    /// Wall-clock budget for one summarizer call; expiry routes to the fallback.
    #[serde(default = "default_summarizer_timeout_secs")]
    pub summarizer_timeout_secs: u64,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub enabled: bool,
    /// "openai" is the only real provider today.
    pub provider: String,
    pub model: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // serde defaults and Default must agree; route through an empty table.
        toml::from_str("").expect("empty pipeline config")
    }
}

impl PipelineConfig {
    /// Load from SIGNAL_INBOX_CONFIG_PATH (or the default path). A missing
    /// file is not an error; defaults apply. A present-but-broken file is.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_PIPELINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read pipeline config at {}: {}", path.display(), e)
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        // optional: override the gate trigger from env
        if let Some(n) = std::env::var(ENV_SUMMARY_TRIGGER_CHARS)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            cfg.summary_trigger_chars = n;
        }

        Ok(cfg)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Keep the thresholds in a usable shape even if the TOML is odd.
    fn sanitize(&mut self) {
        if !self.html_prefer_ratio.is_finite() || self.html_prefer_ratio <= 0.0 {
            self.html_prefer_ratio = default_html_prefer_ratio();
        }
        if self.truncate_chars == 0 {
            self.truncate_chars = default_truncate_chars();
        }
        if self.summary_excerpt_chars < self.summary_trigger_chars {
            self.summary_excerpt_chars = default_summary_excerpt_chars();
        }
    }
}
