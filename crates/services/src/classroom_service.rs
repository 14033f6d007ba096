use std::sync::Arc;

use quest_core::model::{Classroom, ClassroomId, JoinCode, TopicId, User, UserId};
use storage::repository::{
    ClassroomRepository, NewClassroomRecord, StorageError, TopicRepository, UserRepository,
};
use tracing::{info, warn};

use crate::Clock;
use crate::error::ClassroomServiceError;

const JOIN_CODE_ATTEMPTS: usize = 5;

/// Result of a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub classroom: Classroom,
    /// `false` when the student was already a member.
    pub newly_joined: bool,
}

/// Teacher-owned classrooms that students join by code.
#[derive(Clone)]
pub struct ClassroomService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicRepository>,
    classrooms: Arc<dyn ClassroomRepository>,
}

impl ClassroomService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        topics: Arc<dyn TopicRepository>,
        classrooms: Arc<dyn ClassroomRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            topics,
            classrooms,
        }
    }

    async fn load_user(&self, id: UserId) -> Result<User, ClassroomServiceError> {
        self.users
            .get_user(id)
            .await?
            .ok_or(ClassroomServiceError::UnknownUser(id))
    }

    /// Create a classroom with a freshly generated join code.
    ///
    /// # Errors
    ///
    /// Returns `ClassroomServiceError::NotATeacher` for non-teachers,
    /// `ClassroomServiceError::Classroom` for a blank name,
    /// `ClassroomServiceError::JoinCodeExhausted` if every generated code
    /// collided, and `ClassroomServiceError::Storage` if persistence fails.
    pub async fn create_classroom(
        &self,
        teacher_id: UserId,
        name: String,
    ) -> Result<Classroom, ClassroomServiceError> {
        let teacher = self.load_user(teacher_id).await?;
        if !teacher.is_teacher() {
            return Err(ClassroomServiceError::NotATeacher(teacher_id));
        }
        let now = self.clock.now();

        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = JoinCode::generate(&mut rand::rng());
            // Validate the name before touching storage.
            let draft = Classroom::new(ClassroomId::new(1), name.clone(), teacher_id, code, now)?;
            let record = NewClassroomRecord {
                name: draft.name().to_owned(),
                teacher_id,
                join_code: draft.join_code().clone(),
                created_at: now,
            };
            match self.classrooms.insert_classroom(record).await {
                Ok(classroom) => {
                    info!(
                        classroom = %classroom.id(),
                        teacher = %teacher_id,
                        code = %classroom.join_code(),
                        "created classroom"
                    );
                    return Ok(classroom);
                }
                Err(StorageError::Conflict) => {
                    warn!(code = %draft.join_code(), "join code collision; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ClassroomServiceError::JoinCodeExhausted)
    }

    /// Add a student to the classroom with the given join code.
    ///
    /// Joining a classroom twice is not an error; the second call reports
    /// `newly_joined: false`.
    ///
    /// # Errors
    ///
    /// Returns `ClassroomServiceError::NotAStudent` for teachers,
    /// `ClassroomServiceError::Classroom` for malformed codes,
    /// `ClassroomServiceError::UnknownJoinCode` if no classroom matches, and
    /// `ClassroomServiceError::Storage` if persistence fails.
    pub async fn join_by_code(
        &self,
        student_id: UserId,
        code: &str,
    ) -> Result<JoinOutcome, ClassroomServiceError> {
        let student = self.load_user(student_id).await?;
        if !student.is_student() {
            return Err(ClassroomServiceError::NotAStudent(student_id));
        }
        let code = JoinCode::parse(code)?;
        let mut classroom = self
            .classrooms
            .find_by_join_code(&code)
            .await?
            .ok_or_else(|| ClassroomServiceError::UnknownJoinCode(code.to_string()))?;

        let newly_joined = classroom.add_member(student_id);
        if newly_joined {
            self.classrooms.update_classroom(&classroom).await?;
            info!(classroom = %classroom.id(), student = %student_id, "student joined classroom");
        }
        Ok(JoinOutcome {
            classroom,
            newly_joined,
        })
    }

    /// Attach a topic to a classroom owned by `teacher_id`.
    ///
    /// # Errors
    ///
    /// Returns `ClassroomServiceError::NotOwner` unless `teacher_id` teaches the
    /// classroom, `UnknownClassroom`/`UnknownTopic` for missing ids, and
    /// `Storage` if persistence fails.
    pub async fn assign_topic(
        &self,
        teacher_id: UserId,
        classroom_id: ClassroomId,
        topic_id: TopicId,
    ) -> Result<Classroom, ClassroomServiceError> {
        let mut classroom = self
            .classrooms
            .get_classroom(classroom_id)
            .await?
            .ok_or(ClassroomServiceError::UnknownClassroom(classroom_id))?;
        if classroom.teacher_id() != teacher_id {
            return Err(ClassroomServiceError::NotOwner {
                user: teacher_id,
                classroom: classroom_id,
            });
        }
        if self.topics.get_topic(topic_id).await?.is_none() {
            return Err(ClassroomServiceError::UnknownTopic(topic_id));
        }
        if classroom.assign_topic(topic_id) {
            self.classrooms.update_classroom(&classroom).await?;
        }
        Ok(classroom)
    }

    /// Classrooms the user teaches or belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ClassroomServiceError::UnknownUser` if the user does not exist.
    pub async fn classrooms_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Classroom>, ClassroomServiceError> {
        self.load_user(user_id).await?;
        Ok(self.classrooms.classrooms_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use quest_core::model::{TopicCategory, TopicDraft, UserDraft};
    use quest_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    struct Fixture {
        repo: InMemoryRepository,
        service: ClassroomService,
        teacher: UserId,
        student: UserId,
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
        let service = ClassroomService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        Fixture {
            repo,
            service,
            teacher,
            student,
        }
    }

    #[tokio::test]
    async fn student_joins_once() {
        let fx = fixture().await;
        let classroom = fx
            .service
            .create_classroom(fx.teacher, "Year 4".into())
            .await
            .unwrap();
        let code = classroom.join_code().as_str().to_lowercase();

        let first = fx.service.join_by_code(fx.student, &code).await.unwrap();
        assert!(first.newly_joined);
        assert!(first.classroom.has_member(fx.student));

        let again = fx.service.join_by_code(fx.student, &code).await.unwrap();
        assert!(!again.newly_joined);
        assert_eq!(again.classroom.members().len(), 1);

        assert_eq!(fx.service.classrooms_for(fx.student).await.unwrap().len(), 1);
        assert_eq!(fx.service.classrooms_for(fx.teacher).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn roles_are_enforced() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_classroom(fx.student, "Mine".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomServiceError::NotATeacher(_)));

        let classroom = fx
            .service
            .create_classroom(fx.teacher, "Year 4".into())
            .await
            .unwrap();
        let err = fx
            .service
            .join_by_code(fx.teacher, classroom.join_code().as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomServiceError::NotAStudent(_)));
    }

    #[tokio::test]
    async fn unknown_code_is_reported() {
        let fx = fixture().await;
        let err = fx
            .service
            .join_by_code(fx.student, "ZZZZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomServiceError::UnknownJoinCode(_)));
    }

    #[tokio::test]
    async fn only_owner_assigns_topics() {
        let fx = fixture().await;
        let other = fx
            .repo
            .insert_user(&UserDraft::teacher("Mr Okafor").validate(fixed_now()).unwrap())
            .await
            .unwrap()
            .id();
        let topic = fx
            .repo
            .insert_topic(
                &TopicDraft::new("Shapes", TopicCategory::Geometry)
                    .validate(fixed_now())
                    .unwrap(),
            )
            .await
            .unwrap();
        let classroom = fx
            .service
            .create_classroom(fx.teacher, "Year 4".into())
            .await
            .unwrap();

        let err = fx
            .service
            .assign_topic(other, classroom.id(), topic.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomServiceError::NotOwner { .. }));

        let updated = fx
            .service
            .assign_topic(fx.teacher, classroom.id(), topic.id())
            .await
            .unwrap();
        assert_eq!(updated.topics(), &[topic.id()]);
    }

    /// Rejects every insert as a join-code collision.
    struct AlwaysConflict;

    #[async_trait]
    impl ClassroomRepository for AlwaysConflict {
        async fn insert_classroom(
            &self,
            _record: NewClassroomRecord,
        ) -> Result<Classroom, StorageError> {
            Err(StorageError::Conflict)
        }

        async fn update_classroom(&self, _classroom: &Classroom) -> Result<(), StorageError> {
            Err(StorageError::NotFound)
        }

        async fn get_classroom(
            &self,
            _id: ClassroomId,
        ) -> Result<Option<Classroom>, StorageError> {
            Ok(None)
        }

        async fn find_by_join_code(
            &self,
            _code: &JoinCode,
        ) -> Result<Option<Classroom>, StorageError> {
            Ok(None)
        }

        async fn classrooms_for_user(&self, _user: UserId) -> Result<Vec<Classroom>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn gives_up_after_repeated_collisions() {
        let fx = fixture().await;
        let service = ClassroomService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(fx.repo.clone()),
            Arc::new(fx.repo.clone()),
            Arc::new(AlwaysConflict),
        );
        let err = service
            .create_classroom(fx.teacher, "Year 4".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomServiceError::JoinCodeExhausted));
    }
}
