use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::grade::GradeLevel;
use crate::model::ids::{TopicId, UserId};

/// XP granted for a topic when the author does not choose a value.
pub const DEFAULT_TOPIC_XP: u32 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic title cannot be empty")]
    EmptyTitle,

    #[error("topic xp reward must be > 0")]
    ZeroXpReward,

    #[error("topic {0} cannot list itself as a prerequisite")]
    SelfPrerequisite(TopicId),

    #[error("unknown topic category: {0}")]
    UnknownCategory(String),
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    Arithmetic,
    Fractions,
    Geometry,
    Algebra,
    Measurement,
    Statistics,
}

impl TopicCategory {
    pub const ALL: [TopicCategory; 6] = [
        TopicCategory::Arithmetic,
        TopicCategory::Fractions,
        TopicCategory::Geometry,
        TopicCategory::Algebra,
        TopicCategory::Measurement,
        TopicCategory::Statistics,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicCategory::Arithmetic => "arithmetic",
            TopicCategory::Fractions => "fractions",
            TopicCategory::Geometry => "geometry",
            TopicCategory::Algebra => "algebra",
            TopicCategory::Measurement => "measurement",
            TopicCategory::Statistics => "statistics",
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicCategory {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        TopicCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| TopicError::UnknownCategory(s.to_string()))
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated topic as entered by a teacher or seed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDraft {
    pub title: String,
    pub description: Option<String>,
    pub level: GradeLevel,
    pub category: TopicCategory,
    pub xp_reward: u32,
    pub prerequisites: Vec<TopicId>,
    pub author: Option<UserId>,
}

impl TopicDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, category: TopicCategory) -> Self {
        Self {
            title: title.into(),
            description: None,
            level: GradeLevel::Any,
            category,
            xp_reward: DEFAULT_TOPIC_XP,
            prerequisites: Vec::new(),
            author: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: GradeLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_xp_reward(mut self, xp: u32) -> Self {
        self.xp_reward = xp;
        self
    }

    #[must_use]
    pub fn with_prerequisites(mut self, prerequisites: impl IntoIterator<Item = TopicId>) -> Self {
        self.prerequisites = prerequisites.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    /// Normalize text fields and check invariants that do not need an id.
    ///
    /// Prerequisites are deduplicated, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyTitle` or `TopicError::ZeroXpReward`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedTopic, TopicError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(TopicError::EmptyTitle);
        }
        if self.xp_reward == 0 {
            return Err(TopicError::ZeroXpReward);
        }

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let mut prerequisites = Vec::with_capacity(self.prerequisites.len());
        for id in self.prerequisites {
            if !prerequisites.contains(&id) {
                prerequisites.push(id);
            }
        }

        Ok(ValidatedTopic {
            title,
            description,
            level: self.level,
            category: self.category,
            xp_reward: self.xp_reward,
            prerequisites,
            author: self.author,
            created_at: now,
        })
    }
}

/// A topic that passed validation but has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTopic {
    title: String,
    description: Option<String>,
    level: GradeLevel,
    category: TopicCategory,
    xp_reward: u32,
    prerequisites: Vec<TopicId>,
    author: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl ValidatedTopic {
    /// # Errors
    ///
    /// Returns `TopicError::SelfPrerequisite` if `id` is among the prerequisites.
    pub fn assign_id(self, id: TopicId) -> Result<Topic, TopicError> {
        if self.prerequisites.contains(&id) {
            return Err(TopicError::SelfPrerequisite(id));
        }
        Ok(Topic {
            id,
            title: self.title,
            description: self.description,
            level: self.level,
            category: self.category,
            xp_reward: self.xp_reward,
            prerequisites: self.prerequisites,
            author: self.author,
            created_at: self.created_at,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> GradeLevel {
        self.level
    }

    #[must_use]
    pub fn category(&self) -> TopicCategory {
        self.category
    }

    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[TopicId] {
        &self.prerequisites
    }

    #[must_use]
    pub fn author(&self) -> Option<UserId> {
        self.author
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A learning unit on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    title: String,
    description: Option<String>,
    level: GradeLevel,
    category: TopicCategory,
    xp_reward: u32,
    prerequisites: Vec<TopicId>,
    author: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl Topic {
    /// Rehydrate a topic from storage, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if the persisted values violate topic invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TopicId,
        title: String,
        description: Option<String>,
        level: GradeLevel,
        category: TopicCategory,
        xp_reward: u32,
        prerequisites: Vec<TopicId>,
        author: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TopicError> {
        TopicDraft {
            title,
            description,
            level,
            category,
            xp_reward,
            prerequisites,
            author,
        }
        .validate(created_at)?
        .assign_id(id)
    }

    /// Apply an edit, keeping id, author and creation time.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if the edited values are invalid.
    pub fn edit(&self, draft: TopicDraft) -> Result<Topic, TopicError> {
        let mut edited = draft.validate(self.created_at)?.assign_id(self.id)?;
        edited.author = self.author;
        Ok(edited)
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> GradeLevel {
        self.level
    }

    #[must_use]
    pub fn category(&self) -> TopicCategory {
        self.category
    }

    #[must_use]
    pub fn xp_reward(&self) -> u32 {
        self.xp_reward
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[TopicId] {
        &self.prerequisites
    }

    #[must_use]
    pub fn author(&self) -> Option<UserId> {
        self.author
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::grade::Grade;
    use crate::time::fixed_now;

    #[test]
    fn rejects_blank_title() {
        let err = TopicDraft::new("   ", TopicCategory::Arithmetic)
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, TopicError::EmptyTitle);
    }

    #[test]
    fn rejects_zero_xp() {
        let err = TopicDraft::new("Addition", TopicCategory::Arithmetic)
            .with_xp_reward(0)
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, TopicError::ZeroXpReward);
    }

    #[test]
    fn trims_and_dedups() {
        let topic = TopicDraft::new("  Fractions  ", TopicCategory::Fractions)
            .with_description("   ")
            .with_prerequisites([TopicId::new(2), TopicId::new(1), TopicId::new(2)])
            .validate(fixed_now())
            .unwrap()
            .assign_id(TopicId::new(5))
            .unwrap();

        assert_eq!(topic.title(), "Fractions");
        assert_eq!(topic.description(), None);
        assert_eq!(topic.prerequisites(), &[TopicId::new(2), TopicId::new(1)]);
        assert_eq!(topic.xp_reward(), DEFAULT_TOPIC_XP);
    }

    #[test]
    fn rejects_self_prerequisite() {
        let err = TopicDraft::new("Loop", TopicCategory::Algebra)
            .with_prerequisites([TopicId::new(3)])
            .validate(fixed_now())
            .unwrap()
            .assign_id(TopicId::new(3))
            .unwrap_err();
        assert_eq!(err, TopicError::SelfPrerequisite(TopicId::new(3)));
    }

    #[test]
    fn edit_keeps_identity() {
        let original = TopicDraft::new("Area", TopicCategory::Geometry)
            .with_author(UserId::new(9))
            .validate(fixed_now())
            .unwrap()
            .assign_id(TopicId::new(4))
            .unwrap();

        let edited = original
            .edit(
                TopicDraft::new("Area and Perimeter", TopicCategory::Geometry)
                    .with_level(GradeLevel::Grade(Grade::new(4).unwrap())),
            )
            .unwrap();

        assert_eq!(edited.id(), TopicId::new(4));
        assert_eq!(edited.author(), Some(UserId::new(9)));
        assert_eq!(edited.created_at(), original.created_at());
        assert_eq!(edited.title(), "Area and Perimeter");
        assert!(edited.level().is_restricted());
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in TopicCategory::ALL {
            assert_eq!(category.as_str().parse::<TopicCategory>().unwrap(), category);
        }
        assert!(matches!(
            "calculus".parse::<TopicCategory>(),
            Err(TopicError::UnknownCategory(_))
        ));
    }
}
