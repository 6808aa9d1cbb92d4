// src/scoring.rs
//! Relevance scoring. Two deliberately separate policies exist in the wider
//! system: user-submitted signals get a fixed high base (trusted source),
//! discovered signals decay with age. Both live here as named functions;
//! this pipeline calls only the user-submission policy.

use crate::signal::ImpactLevel;
use chrono::{DateTime, Utc};

/// Fixed policy for user-submitted signals: base 95, +5 for high impact,
/// capped at 100.
pub fn user_submission_score(impact: ImpactLevel) -> u8 {
    let base: u32 = 95;
    let bonus: u32 = if impact == ImpactLevel::High { 5 } else { 0 };
    (base + bonus).min(100) as u8
}

/// Days after which the freshness bonus has fully decayed.
pub const RECENCY_DECAY_DAYS: f64 = 30.0;

/// Recency-decay policy for discovered signals: base 50, a freshness bonus
/// of up to 30 that decays linearly to zero over 30 days, +20 for high
/// impact. Clamped to [0, 100].
pub fn recency_decay_score(
    published_at: DateTime<Utc>,
    now: DateTime<Utc>,
    impact: ImpactLevel,
) -> u8 {
    let age_days = (now - published_at).num_seconds().max(0) as f64 / 86_400.0;
    let freshness = (1.0 - age_days / RECENCY_DECAY_DAYS).clamp(0.0, 1.0);
    let score = 50.0 + 30.0 * freshness + if impact == ImpactLevel::High { 20.0 } else { 0.0 };
    score.round().clamp(0.0, 100.0) as u8
}
