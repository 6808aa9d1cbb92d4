// src/summarize.rs
//! Summarizer collaborator and the length-gated condensation step.
//!
//! The summarizer is a black box that can fail in every way a remote model
//! service fails: network errors, empty output, looping output. The gate
//! never retries; any failure routes to a deterministic truncation fallback
//! that is assumed safe and not re-validated.

use crate::config::{PipelineConfig, SummarizerConfig};
use crate::repetition;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// System instruction sent with every summarization request.
const SUMMARY_SYSTEM_PROMPT: &str = "You summarize inbound business signals. \
Do not repeat phrases or sentences. Be specific: keep names, numbers, and \
URLs from the source. Produce 300-500 words of plain prose. Output only the \
summary.";

/// Summarizer collaborator: subject plus a bounded content excerpt in,
/// summary text out. Implementations own their transport and model choice.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, subject: &str, excerpt: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Factory: build a summarizer according to config and environment.
///
/// * If `SUMMARIZER_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `config.enabled == false`, returns a failing stub (the gate
///   falls back to truncation, so a disabled summarizer is safe).
/// * Else builds the real provider.
pub fn build_summarizer(config: &SummarizerConfig) -> DynSummarizer {
    if std::env::var("SUMMARIZER_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockSummarizer::fixed(
            "Deterministic test-mode summary: the message describes one external \
development relevant to the tracked idea, names its source, and points at a \
single canonical link for follow-up reading.",
        ));
    }

    if !config.enabled {
        return Arc::new(DisabledSummarizer);
    }

    match config.provider.as_str() {
        "openai" => Arc::new(OpenAiSummarizer::new(Some(&config.model))),
        other => {
            warn!(provider = other, "unknown summarizer provider; disabling");
            Arc::new(DisabledSummarizer)
        }
    }
}

/// OpenAI chat-completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("signal-inbox/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, subject: &str, excerpt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY not set");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let user = format!("Subject: {subject}\n\nContent:\n{excerpt}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SUMMARY_SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 800,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("summarizer HTTP status {}", resp.status());
        }
        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always errors; used when summarization is disabled. The gate treats the
/// error like any provider failure and truncates.
pub struct DisabledSummarizer;

#[async_trait::async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _subject: &str, _excerpt: &str) -> Result<String> {
        anyhow::bail!("summarizer disabled")
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic mock for tests and local runs.
#[derive(Clone, Default)]
pub struct MockSummarizer {
    pub output: Option<String>,
}

impl MockSummarizer {
    pub fn fixed(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
        }
    }

    /// A mock that errors on every call.
    pub fn failing() -> Self {
        Self { output: None }
    }
}

#[async_trait::async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _subject: &str, _excerpt: &str) -> Result<String> {
        match &self.output {
            Some(out) => Ok(out.clone()),
            None => anyhow::bail!("mock summarizer configured to fail"),
        }
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Gate
// ------------------------------------------------------------

/// How the description was produced; feeds signal metadata and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePath {
    /// Content was short enough to use verbatim.
    Passthrough,
    /// A validated summary was accepted.
    Summarized,
    /// Summary missing or rejected; deterministic excerpt used.
    Truncated,
}

#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub description: String,
    pub path: GatePath,
}

impl GateOutcome {
    pub fn summary_used(&self) -> bool {
        self.path == GatePath::Summarized
    }
}

/// Decide whether to summarize `content`, validate the summarizer's output,
/// and fall back to truncation when anything goes wrong. The fallback is
/// never re-validated.
pub async fn condense(
    summarizer: &dyn Summarizer,
    subject: &str,
    content: &str,
    cfg: &PipelineConfig,
) -> GateOutcome {
    let content_chars = content.chars().count();
    if content_chars <= cfg.summary_trigger_chars {
        return GateOutcome {
            description: content.to_string(),
            path: GatePath::Passthrough,
        };
    }

    let excerpt: String = content.chars().take(cfg.summary_excerpt_chars).collect();
    let call = summarizer.summarize(subject, &excerpt);
    let timeout = Duration::from_secs(cfg.summarizer_timeout_secs);

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(summary)) => {
            let summary = summary.trim().to_string();
            let verdict = repetition::assess(&summary, cfg);
            if summary.chars().count() > cfg.summary_min_chars && !verdict.flagged {
                return GateOutcome {
                    description: summary,
                    path: GatePath::Summarized,
                };
            }
            debug!(
                provider = summarizer.name(),
                rule = ?verdict.rule,
                "summary rejected by quality gate; truncating"
            );
        }
        Ok(Err(e)) => {
            warn!(provider = summarizer.name(), error = ?e, "summarizer call failed; truncating");
        }
        Err(_) => {
            warn!(
                provider = summarizer.name(),
                timeout_secs = cfg.summarizer_timeout_secs,
                "summarizer call timed out; truncating"
            );
        }
    }

    let mut description: String = content.chars().take(cfg.truncate_chars).collect();
    if content_chars > cfg.truncate_chars {
        description.push_str(&cfg.truncation_marker);
    }
    GateOutcome {
        description,
        path: GatePath::Truncated,
    }
}
