use std::sync::Arc;

use quest_core::model::{
    AnswerMap, Difficulty, Question, QuestionId, Quiz, QuizId, QuizResult, QuizSource, Topic,
    TopicId, UserId,
};
use quest_core::question_bank::{get_random_questions, get_random_questions_in};
use storage::repository::{QuizRepository, TopicRepository, UserRepository};
use tracing::{debug, info, warn};

use crate::ai_quiz::AiQuizClient;
use crate::error::QuizServiceError;
use crate::progress_service::{ProgressService, SubmissionOutcome};

/// A graded quiz and what it did to the student's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuiz {
    pub result: QuizResult,
    pub outcome: SubmissionOutcome,
}

/// Builds, stores and grades quizzes.
#[derive(Clone)]
pub struct QuizService {
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicRepository>,
    quizzes: Arc<dyn QuizRepository>,
    ai: Arc<AiQuizClient>,
    progress: Arc<ProgressService>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        topics: Arc<dyn TopicRepository>,
        quizzes: Arc<dyn QuizRepository>,
        ai: Arc<AiQuizClient>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            users,
            topics,
            quizzes,
            ai,
            progress,
        }
    }

    async fn load_topic(&self, topic_id: TopicId) -> Result<Topic, QuizServiceError> {
        self.topics
            .get_topic(topic_id)
            .await?
            .ok_or(QuizServiceError::UnknownTopic(topic_id))
    }

    /// Build a practice quiz for a topic.
    ///
    /// Uses the AI client when it is configured and falls back to the local
    /// question bank on any failure. Bank questions come from the topic's
    /// category first, then from the whole bank if the category has none at
    /// the requested difficulty.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::UnknownTopic` if the topic does not exist and
    /// `QuizServiceError::NoQuestions` if `count` is zero.
    pub async fn generate_quiz(
        &self,
        topic_id: TopicId,
        count: usize,
        difficulty: Option<Difficulty>,
    ) -> Result<Quiz, QuizServiceError> {
        if count == 0 {
            return Err(QuizServiceError::NoQuestions);
        }
        let topic = self.load_topic(topic_id).await?;
        let title = format!("{} quiz", topic.title());

        if self.ai.enabled() {
            let level = difficulty.unwrap_or(Difficulty::Medium);
            match self
                .ai
                .generate_questions(topic.title(), topic.category(), count, level)
                .await
            {
                Ok(questions) => {
                    debug!(topic = %topic_id, count = questions.len(), "generated quiz");
                    return Ok(Quiz::new(topic_id, title, QuizSource::Generated, questions)?);
                }
                Err(err) => {
                    warn!(
                        topic = %topic_id,
                        error = %err,
                        "quiz generation failed; using question bank"
                    );
                }
            }
        }

        let questions = bank_questions(&topic, count, difficulty);
        if questions.is_empty() {
            return Err(QuizServiceError::NoQuestions);
        }
        Ok(Quiz::new(topic_id, title, QuizSource::QuestionBank, questions)?)
    }

    /// Grade a student's answers and record the result against the quiz's topic.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if grading fails and
    /// `QuizServiceError::Progress` if the submission is rejected.
    pub async fn grade_quiz(
        &self,
        user_id: UserId,
        quiz: &Quiz,
        answers: AnswerMap,
    ) -> Result<GradedQuiz, QuizServiceError> {
        let result = quiz.grade(&answers)?;
        let outcome = self
            .progress
            .submit_quiz(user_id, quiz.topic_id(), answers, result.score)
            .await?;
        info!(
            user = %user_id,
            topic = %quiz.topic_id(),
            correct = result.correct,
            total = result.total,
            "graded quiz"
        );
        Ok(GradedQuiz { result, outcome })
    }

    /// Store a teacher-written quiz for a topic.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotATeacher` for non-teachers,
    /// `QuizServiceError::UnknownTopic` for a missing topic,
    /// `QuizServiceError::Quiz` for invalid quizzes and
    /// `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(
        &self,
        teacher_id: UserId,
        topic_id: TopicId,
        title: String,
        questions: Vec<Question>,
    ) -> Result<QuizId, QuizServiceError> {
        let teacher = self
            .users
            .get_user(teacher_id)
            .await?
            .ok_or(QuizServiceError::UnknownUser(teacher_id))?;
        if !teacher.is_teacher() {
            return Err(QuizServiceError::NotATeacher(teacher_id));
        }
        self.load_topic(topic_id).await?;

        let quiz = Quiz::new(topic_id, title, QuizSource::Teacher(teacher_id), questions)?;
        let id = self.quizzes.insert_quiz(&quiz).await?;
        info!(quiz = %id, topic = %topic_id, author = %teacher_id, "created quiz");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::UnknownQuiz` if the quiz does not exist.
    pub async fn get_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(QuizServiceError::UnknownQuiz(quiz_id))
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn quizzes_for_topic(
        &self,
        topic_id: TopicId,
    ) -> Result<Vec<(QuizId, Quiz)>, QuizServiceError> {
        Ok(self.quizzes.quizzes_for_topic(topic_id).await?)
    }
}

/// Sample from the bank and renumber 1..=n so ids are unique within the quiz.
fn bank_questions(topic: &Topic, count: usize, difficulty: Option<Difficulty>) -> Vec<Question> {
    let mut rng = rand::rng();
    let mut questions = get_random_questions_in(topic.category(), count, difficulty, &mut rng);
    if questions.is_empty() {
        questions = get_random_questions(count, difficulty, &mut rng);
    }
    questions
        .into_iter()
        .zip(1_u64..)
        .map(|(q, n)| q.with_id(QuestionId::new(n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use quest_core::model::{TopicCategory, TopicDraft, UserDraft};
    use quest_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::Clock;
    use crate::ai_quiz::AiQuizConfig;

    struct Fixture {
        repo: InMemoryRepository,
        teacher: UserId,
        student: UserId,
        topic: Topic,
    }

    async fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let teacher = repo
            .insert_user(&UserDraft::teacher("Ms Rivera").validate(fixed_now()).unwrap())
            .await
            .unwrap()
            .id();
        let student = repo
            .insert_user(&UserDraft::student("Ada", None).validate(fixed_now()).unwrap())
            .await
            .unwrap()
            .id();
        let topic = repo
            .insert_topic(
                &TopicDraft::new("Fractions", TopicCategory::Fractions)
                    .validate(fixed_now())
                    .unwrap(),
            )
            .await
            .unwrap();
        Fixture {
            repo,
            teacher,
            student,
            topic,
        }
    }

    fn service(repo: &InMemoryRepository, ai: AiQuizClient) -> QuizService {
        let progress = ProgressService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        QuizService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(ai),
            Arc::new(progress),
        )
    }

    #[tokio::test]
    async fn falls_back_to_bank_without_ai() {
        let fx = fixture().await;
        let quiz = service(&fx.repo, AiQuizClient::new(None))
            .generate_quiz(fx.topic.id(), 3, None)
            .await
            .unwrap();
        assert_eq!(quiz.source(), QuizSource::QuestionBank);
        assert_eq!(quiz.questions().len(), 3);
        assert!(
            quiz.questions()
                .iter()
                .all(|q| q.category() == TopicCategory::Fractions)
        );
        let ids: Vec<u64> = quiz.questions().iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn falls_back_to_bank_when_ai_is_unreachable() {
        let fx = fixture().await;
        let ai = AiQuizClient::new(Some(AiQuizConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "test".into(),
            model: "test".into(),
        }));
        let quiz = service(&fx.repo, ai)
            .generate_quiz(fx.topic.id(), 2, Some(Difficulty::Easy))
            .await
            .unwrap();
        assert_eq!(quiz.source(), QuizSource::QuestionBank);
        assert!(quiz.questions().iter().all(|q| q.difficulty() == Difficulty::Easy));
    }

    #[tokio::test]
    async fn zero_questions_is_rejected() {
        let fx = fixture().await;
        let err = service(&fx.repo, AiQuizClient::new(None))
            .generate_quiz(fx.topic.id(), 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizServiceError::NoQuestions));
    }

    #[tokio::test]
    async fn grading_records_progress() {
        let fx = fixture().await;
        let service = service(&fx.repo, AiQuizClient::new(None));
        let quiz = service.generate_quiz(fx.topic.id(), 4, None).await.unwrap();

        let perfect: AnswerMap = quiz
            .questions()
            .iter()
            .map(|q| (q.id(), q.correct()))
            .collect();
        let graded = service.grade_quiz(fx.student, &quiz, perfect).await.unwrap();
        assert_eq!(graded.result.correct, 4);
        assert_eq!(graded.result.score.value(), 100);
        assert!(graded.outcome.newly_completed());
        assert_eq!(graded.outcome.xp_awarded, fx.topic.xp_reward());
    }

    #[tokio::test]
    async fn teacher_quiz_is_stored() {
        let fx = fixture().await;
        let service = service(&fx.repo, AiQuizClient::new(None));
        let question = Question::new(
            QuestionId::new(1),
            "What is 1/2 + 1/2?",
            vec!["1".into(), "2".into(), "1/4".into()],
            0,
            Difficulty::Easy,
            TopicCategory::Fractions,
            None,
        )
        .unwrap();

        let id = service
            .create_quiz(fx.teacher, fx.topic.id(), "Halves".into(), vec![question])
            .await
            .unwrap();
        let stored = service.get_quiz(id).await.unwrap();
        assert_eq!(stored.source(), QuizSource::Teacher(fx.teacher));
        assert_eq!(service.quizzes_for_topic(fx.topic.id()).await.unwrap().len(), 1);

        let err = service
            .create_quiz(fx.student, fx.topic.id(), "Nope".into(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizServiceError::NotATeacher(_)));
    }
}
