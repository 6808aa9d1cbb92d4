// src/target.rs
//! Target resolution: which tracked idea an inbound message belongs to.
//! The address pattern is fixed: `idea-<digits>@<domain>`.

use crate::error::IngestError;
use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

/// Parse the idea id out of a target address like `idea-42@signals.example.com`.
/// No match is fatal for the run; nothing has been touched yet at this point.
pub fn resolve_target(address: &str) -> Result<i64, IngestError> {
    static RE_TARGET: OnceCell<Regex> = OnceCell::new();
    let re = RE_TARGET.get_or_init(|| Regex::new(r"(?i)\bidea-(\d+)@").expect("target regex"));

    let caps = re
        .captures(address)
        .ok_or_else(|| IngestError::Validation(format!("no idea id in address `{address}`")))?;
    caps[1]
        .parse::<i64>()
        .map_err(|_| IngestError::Validation(format!("idea id out of range in `{address}`")))
}

/// Idea context returned by the directory collaborator. The pipeline only
/// needs the id to resolve; the rest is carried for logging.
#[derive(Debug, Clone)]
pub struct IdeaContext {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub mission: String,
}

/// Directory collaborator: given an idea id, return its context if tracked.
#[async_trait::async_trait]
pub trait IdeaDirectory: Send + Sync {
    async fn lookup(&self, idea_id: i64) -> Result<Option<IdeaContext>>;
}

/// In-memory directory for tests and local runs.
#[derive(Default)]
pub struct MemoryIdeaDirectory {
    ideas: RwLock<HashMap<i64, IdeaContext>>,
}

impl MemoryIdeaDirectory {
    pub fn with_ideas(ideas: impl IntoIterator<Item = IdeaContext>) -> Self {
        let map = ideas.into_iter().map(|i| (i.id, i)).collect();
        Self {
            ideas: RwLock::new(map),
        }
    }

    pub fn add(&self, idea: IdeaContext) {
        if let Ok(mut map) = self.ideas.write() {
            map.insert(idea.id, idea);
        }
    }

    /// Placeholder context for ids seeded without metadata (env/local runs).
    pub fn add_bare(&self, id: i64) {
        self.add(IdeaContext {
            id,
            name: format!("idea-{id}"),
            category: String::new(),
            mission: String::new(),
        });
    }
}

#[async_trait::async_trait]
impl IdeaDirectory for MemoryIdeaDirectory {
    async fn lookup(&self, idea_id: i64) -> Result<Option<IdeaContext>> {
        let map = self
            .ideas
            .read()
            .map_err(|_| anyhow::anyhow!("idea directory lock poisoned"))?;
        Ok(map.get(&idea_id).cloned())
    }
}
