use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::ai_quiz::AiQuizClient;
use crate::classroom_service::ClassroomService;
use crate::error::AppServicesError;
use crate::learning_map::LearningMapService;
use crate::leaderboard::LeaderboardService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::topic_service::TopicService;
use crate::user_service::UserService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<UserService>,
    topics: Arc<TopicService>,
    learning_map: Arc<LearningMapService>,
    progress: Arc<ProgressService>,
    classrooms: Arc<ClassroomService>,
    quizzes: Arc<QuizService>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the AI client read
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, AiQuizClient::from_env()))
    }

    /// In-memory services with quiz generation disabled.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, AiQuizClient::new(None))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, ai: AiQuizClient) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.topics),
            Arc::clone(&storage.progress),
        ));
        let quizzes = Arc::new(QuizService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.topics),
            Arc::clone(&storage.quizzes),
            Arc::new(ai),
            Arc::clone(&progress),
        ));

        Self {
            users: Arc::new(UserService::new(
                clock,
                Arc::clone(&storage.users),
                Arc::clone(&storage.progress),
            )),
            topics: Arc::new(TopicService::new(
                clock,
                Arc::clone(&storage.users),
                Arc::clone(&storage.topics),
            )),
            learning_map: Arc::new(LearningMapService::new(
                Arc::clone(&storage.users),
                Arc::clone(&storage.topics),
                Arc::clone(&storage.progress),
            )),
            classrooms: Arc::new(ClassroomService::new(
                clock,
                Arc::clone(&storage.users),
                Arc::clone(&storage.topics),
                Arc::clone(&storage.classrooms),
            )),
            leaderboard: Arc::new(LeaderboardService::new(Arc::clone(&storage.users))),
            progress,
            quizzes,
        }
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn topics(&self) -> Arc<TopicService> {
        Arc::clone(&self.topics)
    }

    #[must_use]
    pub fn learning_map(&self) -> Arc<LearningMapService> {
        Arc::clone(&self.learning_map)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn classrooms(&self) -> Arc<ClassroomService> {
        Arc::clone(&self.classrooms)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }
}
