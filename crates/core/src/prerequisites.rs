//! Prerequisite resolution for the learning map.
//!
//! A topic is completed once its own progress record passes, available when
//! every prerequisite is completed, and locked otherwise. [`PrerequisiteGraph`]
//! checks a catalogue for dangling ids and cycles and orders topics so
//! prerequisites come first.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use thiserror::Error;

use crate::model::{Topic, TopicId};

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicStatus {
    Completed,
    Available,
    /// Prerequisites not yet completed, in declaration order.
    Locked { missing: Vec<TopicId> },
}

impl TopicStatus {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, TopicStatus::Locked { .. })
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TopicStatus::Completed => "completed",
            TopicStatus::Available => "available",
            TopicStatus::Locked { .. } => "locked",
        }
    }
}

/// Status of `topic` given the ids the user has completed.
#[must_use]
pub fn status(topic: &Topic, completed: &HashSet<TopicId>) -> TopicStatus {
    if completed.contains(&topic.id()) {
        return TopicStatus::Completed;
    }
    let missing: Vec<TopicId> = topic
        .prerequisites()
        .iter()
        .copied()
        .filter(|id| !completed.contains(id))
        .collect();
    if missing.is_empty() {
        TopicStatus::Available
    } else {
        TopicStatus::Locked { missing }
    }
}

#[must_use]
pub fn is_unlocked(topic: &Topic, completed: &HashSet<TopicId>) -> bool {
    !status(topic, completed).is_locked()
}

//
// ─── GRAPH ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PrerequisiteError {
    #[error("topic {topic} requires unknown topic {missing}")]
    UnknownPrerequisite { topic: TopicId, missing: TopicId },

    #[error("topic {0} lists itself as a prerequisite")]
    SelfReference(TopicId),

    #[error("prerequisite cycle through topics {0:?}")]
    Cycle(Vec<TopicId>),
}

/// Prerequisite edges of a topic catalogue, in both directions.
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph {
    requires: BTreeMap<TopicId, Vec<TopicId>>,
    unlocks: BTreeMap<TopicId, BTreeSet<TopicId>>,
}

impl PrerequisiteGraph {
    #[must_use]
    pub fn from_topics<'a>(topics: impl IntoIterator<Item = &'a Topic>) -> Self {
        let mut graph = Self::default();
        for topic in topics {
            graph.insert(topic.id(), topic.prerequisites().to_vec());
        }
        graph
    }

    /// Add or replace a topic's prerequisite list.
    pub fn insert(&mut self, id: TopicId, prerequisites: Vec<TopicId>) {
        if let Some(previous) = self.requires.remove(&id) {
            for p in previous {
                if let Some(set) = self.unlocks.get_mut(&p) {
                    set.remove(&id);
                }
            }
        }
        for p in &prerequisites {
            self.unlocks.entry(*p).or_default().insert(id);
        }
        self.requires.insert(id, prerequisites);
    }

    #[must_use]
    pub fn contains(&self, id: TopicId) -> bool {
        self.requires.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requires.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty()
    }

    #[must_use]
    pub fn prerequisites(&self, id: TopicId) -> &[TopicId] {
        self.requires.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Topics that list `id` as a direct prerequisite, ascending by id.
    #[must_use]
    pub fn dependents(&self, id: TopicId) -> Vec<TopicId> {
        self.unlocks
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check that every prerequisite exists and that there are no cycles.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, checking topics in ascending id order.
    pub fn validate(&self) -> Result<(), PrerequisiteError> {
        for (topic, prereqs) in &self.requires {
            for p in prereqs {
                if p == topic {
                    return Err(PrerequisiteError::SelfReference(*topic));
                }
                if !self.requires.contains_key(p) {
                    return Err(PrerequisiteError::UnknownPrerequisite {
                        topic: *topic,
                        missing: *p,
                    });
                }
            }
        }
        self.topological_order().map(|_| ())
    }

    /// Kahn's algorithm; among topics whose prerequisites are satisfied the
    /// lowest id goes first. Unknown prerequisite ids are ignored here.
    ///
    /// # Errors
    ///
    /// Returns `PrerequisiteError::Cycle` with the ids left unordered.
    pub fn topological_order(&self) -> Result<Vec<TopicId>, PrerequisiteError> {
        let mut pending: HashMap<TopicId, usize> = self
            .requires
            .iter()
            .map(|(id, prereqs)| {
                let known = prereqs
                    .iter()
                    .filter(|p| self.requires.contains_key(p))
                    .count();
                (*id, known)
            })
            .collect();

        let mut ready: BTreeSet<TopicId> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.requires.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            pending.remove(&next);
            for dependent in self.dependents(next) {
                if let Some(n) = pending.get_mut(&dependent) {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if pending.is_empty() {
            Ok(order)
        } else {
            let mut stuck: Vec<TopicId> = pending.into_keys().collect();
            stuck.sort_unstable();
            Err(PrerequisiteError::Cycle(stuck))
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
