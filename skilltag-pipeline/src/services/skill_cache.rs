//! Lazily built skill → knowledge excerpt cache shared by a round's workers

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::knowledge_base::KnowledgeBase;
use crate::models::Round;

/// Per-round excerpt cache
///
/// Lookup and insert happen under one lock, so each skill's excerpt is
/// rendered at most once no matter how many workers ask concurrently.
pub struct SkillInfoCache {
    round: Round,
    knowledge_base: Arc<KnowledgeBase>,
    entries: Mutex<HashMap<String, Arc<String>>>,
    builds: AtomicUsize,
}

impl SkillInfoCache {
    pub fn new(round: Round, knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self {
            round,
            knowledge_base,
            entries: Mutex::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Excerpt for a skill, rendering it on first use
    ///
    /// `None` when the skill has no knowledge base entry.
    pub fn get_or_build(&self, skill_lower: &str) -> Option<Arc<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(excerpt) = entries.get(skill_lower) {
            return Some(Arc::clone(excerpt));
        }

        let rendered = match self.round {
            Round::R1 => self.knowledge_base.render_full(skill_lower),
            Round::R2 => self.knowledge_base.render_flat(skill_lower),
        }?;
        self.builds.fetch_add(1, Ordering::Relaxed);

        let excerpt = Arc::new(rendered);
        entries.insert(skill_lower.to_string(), Arc::clone(&excerpt));
        Some(excerpt)
    }

    /// Number of excerpts rendered so far
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}
