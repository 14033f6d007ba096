#![forbid(unsafe_code)]

pub mod ai_quiz;
pub mod app_services;
pub mod classroom_service;
pub mod error;
pub mod leaderboard;
pub mod learning_map;
pub mod progress_service;
pub mod quiz_service;
pub mod topic_service;
pub mod user_service;

pub use quest_core::Clock;

pub use ai_quiz::{AiQuizClient, AiQuizConfig};
pub use app_services::AppServices;
pub use classroom_service::{ClassroomService, JoinOutcome};
pub use error::{
    AiQuizError, AppServicesError, ClassroomServiceError, LearningMapError, ProgressServiceError,
    QuizServiceError, TopicServiceError, UserServiceError,
};
pub use leaderboard::{LeaderboardEntry, LeaderboardService};
pub use learning_map::{LearningMap, LearningMapService, MapEntry, TopicDetail};
pub use progress_service::{ProgressService, SubmissionOutcome};
pub use quiz_service::{GradedQuiz, QuizService};
pub use topic_service::TopicService;
pub use user_service::{Profile, UserService};
