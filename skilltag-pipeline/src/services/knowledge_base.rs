//! Per-skill, per-level knowledge base derived from the framework table
//!
//! Built once per run from the sector-filtered framework rows. The same rows
//! always produce the same knowledge base: skills are keyed in a `BTreeMap`,
//! levels are sorted, and items keep first-seen order with duplicates removed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::{skill_key, FrameworkRow, ItemKind};

/// Supporting text for one proficiency level of one skill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelKnowledge {
    pub level: u8,
    pub description: Option<String>,
    pub knowledge: Vec<String>,
    pub ability: Vec<String>,
}

impl LevelKnowledge {
    fn new(level: u8) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    fn add_item(&mut self, kind: ItemKind, item: &str) {
        let list = match kind {
            ItemKind::Knowledge => &mut self.knowledge,
            ItemKind::Ability => &mut self.ability,
        };
        if !list.iter().any(|existing| existing == item) {
            list.push(item.to_string());
        }
    }

    /// Knowledge then ability items, joined with ", "
    pub fn joined_items(&self) -> String {
        self.knowledge
            .iter()
            .chain(self.ability.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// All levels of one skill, ordered by level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillKnowledge {
    /// Title as first seen in the framework
    pub skill_title: String,
    pub levels: Vec<LevelKnowledge>,
}

/// Flattened Round 2 entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatLevel {
    pub level: u8,
    pub items: String,
}

/// Immutable skill → levels mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    skills: BTreeMap<String, SkillKnowledge>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl KnowledgeBase {
    /// Build from framework rows belonging to `sectors`
    ///
    /// An empty sector list keeps every row.
    pub fn build(rows: &[FrameworkRow], sectors: &[String]) -> Self {
        let mut staged: BTreeMap<String, (String, BTreeMap<u8, LevelKnowledge>)> = BTreeMap::new();

        for row in rows {
            if !sectors.is_empty() && !row.in_sectors(sectors) {
                continue;
            }
            let key = row.skill_key();
            if key.is_empty() {
                continue;
            }

            let (_, levels) = staged
                .entry(key)
                .or_insert_with(|| (row.skill_title.trim().to_string(), BTreeMap::new()));
            let level = levels
                .entry(row.proficiency_level)
                .or_insert_with(|| LevelKnowledge::new(row.proficiency_level));

            if level.description.is_none() {
                level.description = non_blank(&row.proficiency_description).map(str::to_string);
            }
            if let (Some(kind), Some(item)) = (row.item_kind(), non_blank(&row.item)) {
                level.add_item(kind, item);
            }
        }

        let skills = staged
            .into_iter()
            .map(|(key, (skill_title, levels))| {
                (
                    key,
                    SkillKnowledge {
                        skill_title,
                        levels: levels.into_values().collect(),
                    },
                )
            })
            .collect();

        Self { skills }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn contains(&self, skill_lower: &str) -> bool {
        self.skills.contains_key(skill_lower)
    }

    pub fn get(&self, skill_lower: &str) -> Option<&SkillKnowledge> {
        self.skills.get(skill_lower)
    }

    /// Normalized keys of every skill in scope
    pub fn skill_set(&self) -> HashSet<String> {
        self.skills.keys().cloned().collect()
    }

    /// Authoritative valid levels; empty for a skill absent from the framework
    pub fn valid_levels(&self, skill: &str) -> BTreeSet<u8> {
        self.skills
            .get(&skill_key(skill))
            .map(|s| s.levels.iter().map(|l| l.level).collect())
            .unwrap_or_default()
    }

    /// Round 1 excerpt: description plus knowledge and ability items per level
    pub fn render_full(&self, skill_lower: &str) -> Option<String> {
        let skill = self.skills.get(skill_lower)?;
        let mut out = format!("Skill: {}\n\n", skill.skill_title);
        for level in &skill.levels {
            out.push_str(&format!("Proficiency Level: {}\n", level.level));
            if let Some(description) = &level.description {
                out.push_str(&format!("Proficiency Description: {}\n", description));
            }
            if !level.knowledge.is_empty() {
                out.push_str(&format!("Knowledge: {}\n", level.knowledge.join("; ")));
            }
            if !level.ability.is_empty() {
                out.push_str(&format!("Ability: {}\n", level.ability.join("; ")));
            }
            out.push('\n');
        }
        Some(out)
    }

    /// Round 2 entries: one `{level, items}` per level
    pub fn flat_levels(&self, skill_lower: &str) -> Option<Vec<FlatLevel>> {
        self.skills.get(skill_lower).map(|skill| {
            skill
                .levels
                .iter()
                .map(|l| FlatLevel {
                    level: l.level,
                    items: l.joined_items(),
                })
                .collect()
        })
    }

    /// Round 2 excerpt rendered as a JSON array
    pub fn render_flat(&self, skill_lower: &str) -> Option<String> {
        let levels = self.flat_levels(skill_lower)?;
        serde_json::to_string(&levels).ok()
    }
}
