use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use quest_core::model::{
    Classroom, ClassroomId, JoinCode, ProgressRecord, Quiz, QuizId, Topic, TopicId, User, UserId,
    ValidatedTopic, ValidatedUser,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Classroom fields known before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewClassroomRecord {
    pub name: String,
    pub teacher_id: UserId,
    pub join_code: JoinCode,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn insert_user(&self, user: &ValidatedUser) -> Result<User, StorageError>;

    /// Persist changes (xp, name, role) to an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// All users ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Store a new topic and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn insert_topic(&self, topic: &ValidatedTopic) -> Result<Topic, StorageError>;

    /// Replace an existing topic, including its prerequisite list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn update_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError>;

    /// The full catalogue ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError>;
}

/// Completion records keyed by (user, topic).
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or replace the record for the record's (user, topic) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Store a record that newly completes a topic together with the xp of
    /// the user it was awarded to. Either both writes land or neither does.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist, or
    /// `StorageError` if either write fails.
    async fn record_completion(
        &self,
        record: &ProgressRecord,
        user: &User,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// All records of a user ordered by topic id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Ids of the topics the user has completed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn completed_topics(&self, user: UserId) -> Result<HashSet<TopicId>, StorageError> {
        Ok(self
            .list_progress(user)
            .await?
            .into_iter()
            .filter(ProgressRecord::completed)
            .map(|r| r.topic_id())
            .collect())
    }
}

#[async_trait]
pub trait ClassroomRepository: Send + Sync {
    /// Store a new, empty classroom.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the join code is taken.
    async fn insert_classroom(&self, record: NewClassroomRecord)
    -> Result<Classroom, StorageError>;

    /// Persist membership and topic assignments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the classroom does not exist.
    async fn update_classroom(&self, classroom: &Classroom) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_classroom(&self, id: ClassroomId) -> Result<Option<Classroom>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_by_join_code(&self, code: &JoinCode) -> Result<Option<Classroom>, StorageError>;

    /// Classrooms the user teaches or belongs to, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn classrooms_for_user(&self, user: UserId) -> Result<Vec<Classroom>, StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Quizzes attached to a topic, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn quizzes_for_topic(&self, topic: TopicId) -> Result<Vec<(QuizId, Quiz)>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    users: BTreeMap<UserId, User>,
    topics: BTreeMap<TopicId, Topic>,
    progress: HashMap<(UserId, TopicId), ProgressRecord>,
    classrooms: BTreeMap<ClassroomId, Classroom>,
    quizzes: BTreeMap<QuizId, Quiz>,
}

impl MemoryState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &ValidatedUser) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        let id = UserId::new(guard.allocate());
        let stored = user.clone().assign_id(id);
        guard.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.users.get_mut(&user.id()).ok_or(StorageError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn insert_topic(&self, topic: &ValidatedTopic) -> Result<Topic, StorageError> {
        let mut guard = self.lock()?;
        let id = TopicId::new(guard.allocate());
        let stored = topic
            .clone()
            .assign_id(id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.topics.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.topics.get_mut(&topic.id()).ok_or(StorageError::NotFound)?;
        *slot = topic.clone();
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        Ok(self.lock()?.topics.get(&id).cloned())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        Ok(self.lock()?.topics.values().cloned().collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        self.lock()?
            .progress
            .insert((record.user_id(), record.topic_id()), record.clone());
        Ok(())
    }

    async fn record_completion(
        &self,
        record: &ProgressRecord,
        user: &User,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.users.get_mut(&user.id()).ok_or(StorageError::NotFound)?;
        *slot = user.clone();
        guard
            .progress
            .insert((record.user_id(), record.topic_id()), record.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        Ok(self.lock()?.progress.get(&(user, topic)).cloned())
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<ProgressRecord> = guard
            .progress
            .values()
            .filter(|r| r.user_id() == user)
            .cloned()
            .collect();
        records.sort_by_key(ProgressRecord::topic_id);
        Ok(records)
    }
}

#[async_trait]
impl ClassroomRepository for InMemoryRepository {
    async fn insert_classroom(
        &self,
        record: NewClassroomRecord,
    ) -> Result<Classroom, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .classrooms
            .values()
            .any(|c| c.join_code() == &record.join_code)
        {
            return Err(StorageError::Conflict);
        }
        let id = ClassroomId::new(guard.allocate());
        let classroom = Classroom::new(
            id,
            record.name,
            record.teacher_id,
            record.join_code,
            record.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.classrooms.insert(id, classroom.clone());
        Ok(classroom)
    }

    async fn update_classroom(&self, classroom: &Classroom) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .classrooms
            .get_mut(&classroom.id())
            .ok_or(StorageError::NotFound)?;
        *slot = classroom.clone();
        Ok(())
    }

    async fn get_classroom(&self, id: ClassroomId) -> Result<Option<Classroom>, StorageError> {
        Ok(self.lock()?.classrooms.get(&id).cloned())
    }

    async fn find_by_join_code(&self, code: &JoinCode) -> Result<Option<Classroom>, StorageError> {
        Ok(self
            .lock()?
            .classrooms
            .values()
            .find(|c| c.join_code() == code)
            .cloned())
    }

    async fn classrooms_for_user(&self, user: UserId) -> Result<Vec<Classroom>, StorageError> {
        Ok(self
            .lock()?
            .classrooms
            .values()
            .filter(|c| c.teacher_id() == user || c.has_member(user))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let mut guard = self.lock()?;
        let id = QuizId::new(guard.allocate());
        guard.quizzes.insert(id, quiz.clone());
        Ok(id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.get(&id).cloned())
    }

    async fn quizzes_for_topic(&self, topic: TopicId) -> Result<Vec<(QuizId, Quiz)>, StorageError> {
        Ok(self
            .lock()?
            .quizzes
            .iter()
            .filter(|(_, q)| q.topic_id() == topic)
            .map(|(id, q)| (*id, q.clone()))
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub classrooms: Arc<dyn ClassroomRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            classrooms: Arc::new(repo.clone()),
            quizzes: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::{AnswerMap, Score, TopicCategory, TopicDraft, UserDraft};
    use quest_core::time::fixed_now;

    #[tokio::test]
    async fn ids_are_assigned_on_insert() {
        let repo = InMemoryRepository::new();
        let ada = UserDraft::student("Ada", None).validate(fixed_now()).unwrap();
        let first = repo.insert_user(&ada).await.unwrap();
        let topic = TopicDraft::new("Counting", TopicCategory::Arithmetic)
            .validate(fixed_now())
            .unwrap();
        let stored = repo.insert_topic(&topic).await.unwrap();

        assert_ne!(first.id().value(), stored.id().value());
        assert_eq!(repo.get_topic(stored.id()).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn completed_topics_only_lists_passing_records() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let now = fixed_now();
        for (topic, score) in [(1, 90), (2, 50), (3, 70)] {
            let record = ProgressRecord::first_attempt(
                user,
                TopicId::new(topic),
                Score::new(score).unwrap(),
                AnswerMap::new(),
                now,
            );
            repo.upsert_progress(&record).await.unwrap();
        }

        let completed = repo.completed_topics(user).await.unwrap();
        assert_eq!(completed.len(), 2);
        assert!(completed.contains(&TopicId::new(1)));
        assert!(completed.contains(&TopicId::new(3)));
        assert!(repo.completed_topics(UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completion_for_missing_user_writes_nothing() {
        let repo = InMemoryRepository::new();
        let ghost = UserDraft::student("Ghost", None)
            .validate(fixed_now())
            .unwrap()
            .assign_id(UserId::new(9));
        let record = ProgressRecord::first_attempt(
            ghost.id(),
            TopicId::new(1),
            Score::new(100).unwrap(),
            AnswerMap::new(),
            fixed_now(),
        );

        let err = repo.record_completion(&record, &ghost).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.list_progress(ghost.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_join_code_conflicts() {
        let repo = InMemoryRepository::new();
        let record = NewClassroomRecord {
            name: "5B".into(),
            teacher_id: UserId::new(1),
            join_code: JoinCode::parse("ABC234").unwrap(),
            created_at: fixed_now(),
        };
        repo.insert_classroom(record.clone()).await.unwrap();
        let err = repo.insert_classroom(record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let repo = InMemoryRepository::new();
        let ghost = UserDraft::teacher("Ghost")
            .validate(fixed_now())
            .unwrap()
            .assign_id(UserId::new(77));
        let err = repo.update_user(&ghost).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
