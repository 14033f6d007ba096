use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, TopicId, UserId};
use crate::model::progress::{AnswerMap, ProgressError, Score};
use crate::model::topic::TopicCategory;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs between {MIN_OPTIONS} and {MAX_OPTIONS} options, got {0}")]
    OptionCount(usize),

    #[error("question options cannot be empty")]
    EmptyOption,

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOutOfRange { index: usize, len: usize },

    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("too many questions for one quiz: {0}")]
    TooManyQuestions(usize),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("unknown quiz source: {0}")]
    UnknownSource(String),

    #[error(transparent)]
    Score(#[from] ProgressError),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == lowered)
            .ok_or_else(|| QuizError::UnknownDifficulty(s.to_string()))
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct: usize,
    difficulty: Difficulty,
    category: TopicCategory,
    explanation: Option<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuizError` if the prompt or an option is blank, the option
    /// count is outside `MIN_OPTIONS..=MAX_OPTIONS`, or `correct` is out of range.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
        difficulty: Difficulty,
        category: TopicCategory,
        explanation: Option<String>,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into().trim().to_owned();
        if prompt.is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(QuizError::OptionCount(options.len()));
        }
        let options: Vec<String> = options.into_iter().map(|o| o.trim().to_owned()).collect();
        if options.iter().any(String::is_empty) {
            return Err(QuizError::EmptyOption);
        }
        if correct >= options.len() {
            return Err(QuizError::CorrectOutOfRange {
                index: correct,
                len: options.len(),
            });
        }
        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            id,
            prompt,
            options,
            correct,
            difficulty,
            category,
            explanation,
        })
    }

    /// Unchecked constructor for the static bank, whose entries are covered by tests.
    pub(crate) fn from_static(
        id: QuestionId,
        prompt: &str,
        options: &[&str],
        correct: usize,
        difficulty: Difficulty,
        category: TopicCategory,
        explanation: &str,
    ) -> Self {
        Self {
            id,
            prompt: prompt.to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
            difficulty,
            category,
            explanation: Some(explanation.to_owned()).filter(|e| !e.is_empty()),
        }
    }

    /// Same question under another id, used when assembling a quiz.
    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn category(&self) -> TopicCategory {
        self.category
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Where a quiz's questions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizSource {
    Teacher(UserId),
    QuestionBank,
    Generated,
}

impl QuizSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizSource::Teacher(_) => "teacher",
            QuizSource::QuestionBank => "bank",
            QuizSource::Generated => "generated",
        }
    }

    /// # Errors
    ///
    /// Returns `QuizError::UnknownSource` for unknown names or a teacher source
    /// without an author.
    pub fn from_parts(name: &str, author: Option<UserId>) -> Result<Self, QuizError> {
        match (name, author) {
            ("teacher", Some(author)) => Ok(QuizSource::Teacher(author)),
            ("bank", _) => Ok(QuizSource::QuestionBank),
            ("generated", _) => Ok(QuizSource::Generated),
            _ => Err(QuizError::UnknownSource(name.to_string())),
        }
    }

    #[must_use]
    pub fn author(self) -> Option<UserId> {
        match self {
            QuizSource::Teacher(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    topic_id: TopicId,
    title: String,
    source: QuizSource,
    questions: Vec<Question>,
}

/// Per-quiz grading result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub correct: u32,
    pub total: u32,
    pub score: Score,
    /// Question ids answered incorrectly or left blank, in quiz order.
    pub missed: Vec<QuestionId>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle`, `QuizError::NoQuestions` or
    /// `QuizError::DuplicateQuestion`.
    pub fn new(
        topic_id: TopicId,
        title: impl Into<String>,
        source: QuizSource,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(QuizError::DuplicateQuestion(q.id()));
            }
        }
        Ok(Self {
            topic_id,
            title,
            source,
            questions,
        })
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn source(&self) -> QuizSource {
        self.source
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Grade answers by question id. Missing answers count as wrong and
    /// answers to unknown questions are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::TooManyQuestions` if the question count overflows `u32`.
    pub fn grade(&self, answers: &AnswerMap) -> Result<QuizResult, QuizError> {
        let mut correct = 0_u32;
        let mut missed = Vec::new();
        for q in &self.questions {
            match answers.get(&q.id()) {
                Some(choice) if q.is_correct(*choice) => correct += 1,
                _ => missed.push(q.id()),
            }
        }
        let total = u32::try_from(self.questions.len())
            .map_err(|_| QuizError::TooManyQuestions(self.questions.len()))?;
        let score = Score::from_ratio(correct, total)?;
        Ok(QuizResult {
            correct,
            total,
            score,
            missed,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
