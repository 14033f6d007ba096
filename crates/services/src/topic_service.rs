use std::sync::Arc;

use quest_core::access::{can_require, visible_topics};
use quest_core::model::{GradeLevel, Topic, TopicDraft, TopicId, User, UserId};
use quest_core::prerequisites::PrerequisiteGraph;
use storage::repository::{TopicRepository, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::TopicServiceError;

/// Maintains the topic catalogue. Only teachers may change it.
#[derive(Clone)]
pub struct TopicService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicRepository>,
}

impl TopicService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        topics: Arc<dyn TopicRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            topics,
        }
    }

    async fn require_teacher(&self, actor: UserId) -> Result<User, TopicServiceError> {
        let user = self
            .users
            .get_user(actor)
            .await?
            .ok_or(TopicServiceError::UnknownUser(actor))?;
        if !user.is_teacher() {
            return Err(TopicServiceError::NotATeacher(actor));
        }
        Ok(user)
    }

    /// Add a topic authored by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotATeacher` for non-teachers,
    /// `TopicServiceError::Topic` for invalid drafts,
    /// `TopicServiceError::UnknownPrerequisite` if a prerequisite does not exist,
    /// `TopicServiceError::IncompatiblePrerequisite` if a prerequisite is
    /// restricted to a grade the new topic is not restricted to, and
    /// `TopicServiceError::Storage` if persistence fails.
    pub async fn create_topic(
        &self,
        actor: UserId,
        draft: TopicDraft,
    ) -> Result<Topic, TopicServiceError> {
        self.require_teacher(actor).await?;
        let validated = draft.with_author(actor).validate(self.clock.now())?;

        let catalogue = self.topics.list_topics().await?;
        check_prerequisite_levels(validated.level(), validated.prerequisites(), &catalogue)?;

        let topic = self.topics.insert_topic(&validated).await?;
        info!(topic = %topic.id(), author = %actor, title = topic.title(), "created topic");
        Ok(topic)
    }

    /// Replace a topic's editable fields, keeping id, author and creation time.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::UnknownTopic` if the topic does not exist,
    /// `TopicServiceError::Prerequisites` if the edit would reference an
    /// unknown topic or close a cycle, `TopicServiceError::IncompatiblePrerequisite`
    /// if the new level strands a topic that requires this one, plus the errors
    /// of `create_topic`.
    pub async fn update_topic(
        &self,
        actor: UserId,
        topic_id: TopicId,
        draft: TopicDraft,
    ) -> Result<Topic, TopicServiceError> {
        self.require_teacher(actor).await?;
        let existing = self
            .topics
            .get_topic(topic_id)
            .await?
            .ok_or(TopicServiceError::UnknownTopic(topic_id))?;
        let edited = existing.edit(draft)?;

        let catalogue = self.topics.list_topics().await?;
        let mut graph = PrerequisiteGraph::from_topics(&catalogue);
        graph.insert(edited.id(), edited.prerequisites().to_vec());
        graph.validate()?;
        check_prerequisite_levels(edited.level(), edited.prerequisites(), &catalogue)?;
        if let Some(dependent) = catalogue.iter().find(|t| {
            t.id() != topic_id
                && t.prerequisites().contains(&topic_id)
                && !can_require(t.level(), edited.level())
        }) {
            return Err(TopicServiceError::IncompatiblePrerequisite {
                prerequisite: topic_id,
                level: edited.level(),
                dependent: dependent.level(),
            });
        }

        self.topics.update_topic(&edited).await?;
        info!(topic = %topic_id, editor = %actor, "updated topic");
        Ok(edited)
    }

    /// Topics `viewer` may see, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::UnknownUser` if the viewer does not exist.
    pub async fn list_topics(&self, viewer: UserId) -> Result<Vec<Topic>, TopicServiceError> {
        let user = self
            .users
            .get_user(viewer)
            .await?
            .ok_or(TopicServiceError::UnknownUser(viewer))?;
        let catalogue = self.topics.list_topics().await?;
        Ok(visible_topics(&user, &catalogue)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Every prerequisite must exist and be visible to everyone who sees a topic
/// at `dependent` level.
fn check_prerequisite_levels(
    dependent: GradeLevel,
    prerequisites: &[TopicId],
    catalogue: &[Topic],
) -> Result<(), TopicServiceError> {
    for id in prerequisites {
        let required = catalogue
            .iter()
            .find(|t| t.id() == *id)
            .ok_or(TopicServiceError::UnknownPrerequisite(*id))?;
        if !can_require(dependent, required.level()) {
            return Err(TopicServiceError::IncompatiblePrerequisite {
                prerequisite: *id,
                level: required.level(),
                dependent,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use quest_core::model::{Grade, TopicCategory, UserDraft};
    use quest_core::prerequisites::PrerequisiteError;
    use quest_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn setup() -> (TopicService, UserId, UserId) {
        let repo = InMemoryRepository::new();
        let teacher = repo
            .insert_user(&UserDraft::teacher("Ms Rivera").validate(fixed_now()).unwrap())
            .await
            .unwrap()
            .id();
        let student = repo
            .insert_user(
                &UserDraft::student("Ada", Some(Grade::new(2).unwrap()))
                    .validate(fixed_now())
                    .unwrap(),
            )
            .await
            .unwrap()
            .id();
        let service = TopicService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        (service, teacher, student)
    }

    #[tokio::test]
    async fn teacher_creates_topic_with_author() {
        let (service, teacher, _) = setup().await;
        let topic = service
            .create_topic(teacher, TopicDraft::new("Counting", TopicCategory::Arithmetic))
            .await
            .unwrap();
        assert_eq!(topic.author(), Some(teacher));
    }

    #[tokio::test]
    async fn student_cannot_create_topics() {
        let (service, _, student) = setup().await;
        let err = service
            .create_topic(student, TopicDraft::new("Counting", TopicCategory::Arithmetic))
            .await
            .unwrap_err();
        assert!(matches!(err, TopicServiceError::NotATeacher(_)));
    }

    #[tokio::test]
    async fn unknown_prerequisite_is_rejected() {
        let (service, teacher, _) = setup().await;
        let err = service
            .create_topic(
                teacher,
                TopicDraft::new("Adding", TopicCategory::Arithmetic)
                    .with_prerequisites([TopicId::new(404)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicServiceError::UnknownPrerequisite(id) if id == TopicId::new(404)
        ));
    }

    #[tokio::test]
    async fn edit_that_closes_a_cycle_is_rejected() {
        let (service, teacher, _) = setup().await;
        let a = service
            .create_topic(teacher, TopicDraft::new("A", TopicCategory::Algebra))
            .await
            .unwrap();
        let b = service
            .create_topic(
                teacher,
                TopicDraft::new("B", TopicCategory::Algebra).with_prerequisites([a.id()]),
            )
            .await
            .unwrap();

        let err = service
            .update_topic(
                teacher,
                a.id(),
                TopicDraft::new("A", TopicCategory::Algebra).with_prerequisites([b.id()]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicServiceError::Prerequisites(PrerequisiteError::Cycle(_))
        ));
    }

    #[tokio::test]
    async fn listing_respects_grade_visibility() {
        let (service, teacher, student) = setup().await;
        service
            .create_topic(teacher, TopicDraft::new("Open", TopicCategory::Geometry))
            .await
            .unwrap();
        service
            .create_topic(
                teacher,
                TopicDraft::new("Grade 8", TopicCategory::Geometry)
                    .with_level(GradeLevel::Grade(Grade::new(8).unwrap())),
            )
            .await
            .unwrap();

        assert_eq!(service.list_topics(student).await.unwrap().len(), 1);
        assert_eq!(service.list_topics(teacher).await.unwrap().len(), 2);
    }

    fn grade(n: u8) -> GradeLevel {
        GradeLevel::Grade(Grade::new(n).unwrap())
    }

    #[tokio::test]
    async fn prerequisite_from_another_grade_is_rejected() {
        let (service, teacher, _) = setup().await;
        let fractions = service
            .create_topic(
                teacher,
                TopicDraft::new("Fractions", TopicCategory::Fractions).with_level(grade(4)),
            )
            .await
            .unwrap();

        for level in [grade(5), GradeLevel::Any] {
            let err = service
                .create_topic(
                    teacher,
                    TopicDraft::new("Equations", TopicCategory::Algebra)
                        .with_level(level)
                        .with_prerequisites([fractions.id()]),
                )
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                TopicServiceError::IncompatiblePrerequisite { prerequisite, dependent, .. }
                    if prerequisite == fractions.id() && dependent == level
            ));
        }

        service
            .create_topic(
                teacher,
                TopicDraft::new("Mixed Numbers", TopicCategory::Fractions)
                    .with_level(grade(4))
                    .with_prerequisites([fractions.id()]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn restricting_a_prerequisite_used_by_open_topics_is_rejected() {
        let (service, teacher, _) = setup().await;
        let counting = service
            .create_topic(teacher, TopicDraft::new("Counting", TopicCategory::Arithmetic))
            .await
            .unwrap();
        service
            .create_topic(
                teacher,
                TopicDraft::new("Adding", TopicCategory::Arithmetic)
                    .with_prerequisites([counting.id()]),
            )
            .await
            .unwrap();

        let err = service
            .update_topic(
                teacher,
                counting.id(),
                TopicDraft::new("Counting", TopicCategory::Arithmetic).with_level(grade(3)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicServiceError::IncompatiblePrerequisite {
                prerequisite,
                dependent: GradeLevel::Any,
                ..
            } if prerequisite == counting.id()
        ));
    }
}
