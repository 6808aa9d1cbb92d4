// src/store.rs
//! Persistence collaborator. The pipeline only ever asks two things: does a
//! signal for (idea, canonical URL) exist, and insert this candidate. The
//! exists-then-insert sequence is not atomic across concurrent runs; the
//! store's own uniqueness enforcement on (idea_id, canonical_url) is the
//! backstop, reported as `Duplicate` rather than an error.

use crate::signal::CandidateSignal;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored; carries the new row id.
    Saved(String),
    /// Uniqueness backstop fired: the pair already exists.
    Duplicate,
}

#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    async fn exists(&self, idea_id: i64, canonical_url: &str) -> Result<bool>;
    async fn insert(&self, idea_id: i64, signal: &CandidateSignal) -> Result<InsertOutcome>;
}

/// In-memory store for tests and local runs, keyed by (idea_id, url).
#[derive(Default)]
pub struct MemorySignalStore {
    rows: RwLock<HashMap<(i64, String), CandidateSignal>>,
    next_id: AtomicU64,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idea_id: i64, canonical_url: &str) -> Option<CandidateSignal> {
        self.rows
            .read()
            .ok()?
            .get(&(idea_id, canonical_url.to_string()))
            .cloned()
    }
}

#[async_trait::async_trait]
impl SignalStore for MemorySignalStore {
    async fn exists(&self, idea_id: i64, canonical_url: &str) -> Result<bool> {
        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow::anyhow!("signal store lock poisoned"))?;
        Ok(rows.contains_key(&(idea_id, canonical_url.to_string())))
    }

    async fn insert(&self, idea_id: i64, signal: &CandidateSignal) -> Result<InsertOutcome> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow::anyhow!("signal store lock poisoned"))?;
        let key = (idea_id, signal.canonical_url.clone());
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.insert(key, signal.clone());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(InsertOutcome::Saved(id.to_string()))
    }
}
