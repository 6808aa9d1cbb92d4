// src/pipeline.rs
//! The message-to-signal pipeline. One inbound email in, one run report
//! out. Stages, in order: resolve target -> reconcile content -> strip
//! quoting -> condense (summarize or truncate) -> assemble -> dedup ->
//! persist. Failure before assembly is fatal to the run; persistence
//! failures are isolated per candidate.

use crate::config::PipelineConfig;
use crate::content;
use crate::error::IngestError;
use crate::signal::{self, CandidateSignal};
use crate::scoring;
use crate::store::{InsertOutcome, SignalStore};
use crate::summarize::{self, Summarizer};
use crate::target::{self, IdeaDirectory};
use crate::urls;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("inbound_messages_total", "Inbound messages accepted for processing.");
        describe_counter!("signals_saved_total", "Candidate signals persisted.");
        describe_counter!(
            "signals_skipped_total",
            "Candidate signals skipped as duplicates."
        );
        describe_counter!("summaries_used_total", "Runs whose description is a validated summary.");
        describe_counter!(
            "summary_fallback_total",
            "Runs that fell back to the truncated excerpt."
        );
        describe_counter!(
            "target_rejects_total",
            "Messages rejected for an unresolvable target address."
        );
        describe_counter!("persistence_errors_total", "Per-candidate storage failures.");
    });
}

/// Inbound webhook payload. Attachments are accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmail {
    pub from: String,
    pub subject: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: Option<String>,
    pub to: String,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

/// Per-candidate persistence failure detail, reported without aborting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub canonical_url: String,
    pub error: String,
}

/// Structured run result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub success: bool,
    pub saved_count: usize,
    pub skipped_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

/// Pipeline wiring: the three collaborators plus tuning config. Cheap to
/// clone behind `Arc`s; each message runs through an independent call.
pub struct Pipeline {
    directory: Arc<dyn IdeaDirectory>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn SignalStore>,
    cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        directory: Arc<dyn IdeaDirectory>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn SignalStore>,
        cfg: PipelineConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            directory,
            summarizer,
            store,
            cfg,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Process one inbound message end to end. `Err` is returned only for
    /// the fatal pre-assembly failures (validation, lookup); everything
    /// after assembly is reported inside the `IngestReport`.
    pub async fn process(&self, msg: InboundEmail) -> Result<IngestReport, IngestError> {
        // --- Resolve target (no side effects yet) ---
        let idea_id = match target::resolve_target(&msg.to) {
            Ok(id) => id,
            Err(e) => {
                counter!("target_rejects_total").increment(1);
                return Err(e);
            }
        };
        let idea = self
            .directory
            .lookup(idea_id)
            .await
            .map_err(|e| IngestError::Lookup(format!("idea directory error: {e}")))?
            .ok_or_else(|| IngestError::Lookup(format!("idea {idea_id} not found")))?;

        counter!("inbound_messages_total").increment(1);
        info!(
            idea_id,
            idea = %idea.name,
            content_hash = %anon_hash(&msg.text),
            "processing inbound message"
        );

        // --- Reconcile + strip; URLs come from the raw parts ---
        let web_urls = urls::extract_urls(&msg.text, msg.html.as_deref());
        let reconciled = content::reconcile(&msg.text, msg.html.as_deref(), &self.cfg);
        let cleaned = content::strip_quoted(&reconciled);
        debug!(
            idea_id,
            urls = web_urls.len(),
            chars = cleaned.chars().count(),
            "content reconciled"
        );

        // --- Condense through the quality gate ---
        let gate = summarize::condense(&*self.summarizer, &msg.subject, &cleaned, &self.cfg).await;
        if gate.summary_used() {
            counter!("summaries_used_total").increment(1);
        } else if gate.path == summarize::GatePath::Truncated {
            counter!("summary_fallback_total").increment(1);
        }

        // --- Assemble; a Vec today holds exactly one candidate ---
        let candidates = vec![signal::assemble(
            &msg.subject,
            &msg.from,
            gate.description,
            &web_urls,
        )];

        self.persist(idea_id, candidates).await
    }

    /// Dedup-check and persist each candidate. Duplicates are skips, not
    /// errors; storage failures are counted per item and do not stop the
    /// loop.
    async fn persist(
        &self,
        idea_id: i64,
        candidates: Vec<CandidateSignal>,
    ) -> Result<IngestReport, IngestError> {
        let mut saved = 0usize;
        let mut skipped = 0usize;
        let mut errors = Vec::new();

        for mut candidate in candidates {
            let url = candidate.canonical_url.clone();
            match self.store.exists(idea_id, &url).await {
                Ok(true) => {
                    debug!(idea_id, url = %url, "duplicate signal; skipping");
                    skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(idea_id, url = %url, error = ?e, "existence check failed");
                    counter!("persistence_errors_total").increment(1);
                    errors.push(ItemError {
                        canonical_url: url,
                        error: e.to_string(),
                    });
                    continue;
                }
            }

            // Scoring happens at the handoff; this flow is always the
            // user-submission policy.
            candidate.relevance_score = scoring::user_submission_score(candidate.impact_level);

            match self.store.insert(idea_id, &candidate).await {
                Ok(InsertOutcome::Saved(id)) => {
                    info!(
                        idea_id,
                        url = %url,
                        stored_id = %id,
                        score = candidate.relevance_score,
                        "signal persisted"
                    );
                    saved += 1;
                }
                // Concurrent run won the race; same outcome as the
                // up-front check.
                Ok(InsertOutcome::Duplicate) => {
                    debug!(idea_id, url = %url, "insert hit uniqueness backstop; skipping");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(idea_id, url = %url, error = ?e, "insert failed");
                    counter!("persistence_errors_total").increment(1);
                    errors.push(ItemError {
                        canonical_url: url,
                        error: e.to_string(),
                    });
                }
            }
        }

        counter!("signals_saved_total").increment(saved as u64);
        counter!("signals_skipped_total").increment(skipped as u64);

        Ok(IngestReport {
            success: errors.is_empty(),
            saved_count: saved,
            skipped_count: skipped,
            errors,
        })
    }
}

/// Short anonymized content hash for logs. Never log raw bodies.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
