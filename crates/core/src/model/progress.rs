use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, TopicId, UserId};

/// Minimum score for a topic to count as completed.
pub const PASS_MARK: u8 = 70;

/// Chosen option index per question.
pub type AnswerMap = BTreeMap<QuestionId, usize>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u32),

    #[error("cannot compute a score from zero questions")]
    EmptyRatio,

    #[error("completion timestamp does not match score {score}")]
    InconsistentCompletion { score: u8 },

    #[error("attempt count must be > 0")]
    NoAttempts,
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Percentage score in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Score(u8);

impl Score {
    /// # Errors
    ///
    /// Returns `ProgressError::ScoreOutOfRange` above 100.
    pub fn new(value: u32) -> Result<Self, ProgressError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ProgressError::ScoreOutOfRange(value))
    }

    /// Rounded percentage of `correct` out of `total`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyRatio` when `total` is zero and
    /// `ProgressError::ScoreOutOfRange` when `correct > total`.
    pub fn from_ratio(correct: u32, total: u32) -> Result<Self, ProgressError> {
        if total == 0 {
            return Err(ProgressError::EmptyRatio);
        }
        let scaled = (u64::from(correct) * 200 + u64::from(total)) / (u64::from(total) * 2);
        Self::new(u32::try_from(scaled).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_passing(self) -> bool {
        self.0 >= PASS_MARK
    }
}

impl TryFrom<u32> for Score {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        u32::from(score.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// What happened when an attempt was merged into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub improved: bool,
    pub newly_completed: bool,
}

/// Best result of one user on one topic.
///
/// The stored score is the best across attempts; once completed a record
/// stays completed and keeps its first completion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    user_id: UserId,
    topic_id: TopicId,
    score: Score,
    completed_at: Option<DateTime<Utc>>,
    last_attempt_at: DateTime<Utc>,
    attempts: u32,
    answers: AnswerMap,
}

impl ProgressRecord {
    /// Start a record from a first attempt.
    #[must_use]
    pub fn first_attempt(
        user_id: UserId,
        topic_id: TopicId,
        score: Score,
        answers: AnswerMap,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            topic_id,
            score,
            completed_at: score.is_passing().then_some(at),
            last_attempt_at: at,
            attempts: 1,
            answers,
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressError::InconsistentCompletion` if `completed_at` is set
    /// for a failing score or missing for a passing one, and
    /// `ProgressError::NoAttempts` if `attempts` is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        topic_id: TopicId,
        score: Score,
        completed_at: Option<DateTime<Utc>>,
        last_attempt_at: DateTime<Utc>,
        attempts: u32,
        answers: AnswerMap,
    ) -> Result<Self, ProgressError> {
        if score.is_passing() != completed_at.is_some() {
            return Err(ProgressError::InconsistentCompletion {
                score: score.value(),
            });
        }
        if attempts == 0 {
            return Err(ProgressError::NoAttempts);
        }
        Ok(Self {
            user_id,
            topic_id,
            score,
            completed_at,
            last_attempt_at,
            attempts,
            answers,
        })
    }

    /// Fold another attempt into the record, keeping the best score and the
    /// answers that produced it.
    pub fn record_attempt(
        &mut self,
        score: Score,
        answers: AnswerMap,
        at: DateTime<Utc>,
    ) -> AttemptOutcome {
        let was_completed = self.completed();
        let improved = score > self.score;

        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt_at = at;
        if improved {
            self.score = score;
            self.answers = answers;
        }
        if !was_completed && self.score.is_passing() {
            self.completed_at = Some(at);
        }

        AttemptOutcome {
            improved,
            newly_completed: !was_completed && self.completed(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> DateTime<Utc> {
        self.last_attempt_at
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
