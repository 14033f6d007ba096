//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{
    ClassroomError, ClassroomId, GradeLevel, QuizError, QuizId, TopicError, TopicId, UserError,
    UserId,
};
use quest_core::prerequisites::PrerequisiteError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AiQuizClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiQuizError {
    #[error("quiz generation is not configured")]
    Disabled,
    #[error("quiz generation returned an empty response")]
    EmptyResponse,
    #[error("quiz generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("quiz generation returned malformed questions: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LearningMapService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearningMapError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("user {user} may not view topic {topic}")]
    Forbidden { user: UserId, topic: TopicId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("user {0} is not a student")]
    NotAStudent(UserId),
    #[error("user {user} may not view topic {topic}")]
    Forbidden { user: UserId, topic: TopicId },
    #[error("topic {topic} is locked; missing prerequisites {missing:?}")]
    Locked {
        topic: TopicId,
        missing: Vec<TopicId>,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TopicService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TopicServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("user {0} is not a teacher")]
    NotATeacher(UserId),
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("prerequisite {0} does not exist")]
    UnknownPrerequisite(TopicId),
    #[error("prerequisite {prerequisite} ({level}) is out of reach for a {dependent} topic")]
    IncompatiblePrerequisite {
        prerequisite: TopicId,
        level: GradeLevel,
        dependent: GradeLevel,
    },
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Prerequisites(#[from] PrerequisiteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ClassroomService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassroomServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("user {0} is not a teacher")]
    NotATeacher(UserId),
    #[error("user {0} is not a student")]
    NotAStudent(UserId),
    #[error("unknown classroom {0}")]
    UnknownClassroom(ClassroomId),
    #[error("no classroom uses join code {0}")]
    UnknownJoinCode(String),
    #[error("user {user} does not teach classroom {classroom}")]
    NotOwner { user: UserId, classroom: ClassroomId },
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("could not allocate a unique join code")]
    JoinCodeExhausted,
    #[error(transparent)]
    Classroom(#[from] ClassroomError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("user {0} is not a teacher")]
    NotATeacher(UserId),
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("unknown quiz {0}")]
    UnknownQuiz(QuizId),
    #[error("no questions available for the requested quiz")]
    NoQuestions,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
