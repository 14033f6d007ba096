use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quest_core::access::{can_view, visible_topics};
use quest_core::model::{ProgressRecord, Score, Topic, TopicId, User, UserId};
use quest_core::prerequisites::{self, PrerequisiteGraph, TopicStatus};
use storage::repository::{ProgressRepository, TopicRepository, UserRepository};
use tracing::{debug, warn};

use crate::error::LearningMapError;

/// One topic as a particular user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub topic: Topic,
    pub status: TopicStatus,
    pub best_score: Option<Score>,
}

/// The visible catalogue for a user, prerequisites first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningMap {
    pub user: User,
    pub entries: Vec<MapEntry>,
}

impl LearningMap {
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(|s| matches!(s, TopicStatus::Completed))
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.count(|s| matches!(s, TopicStatus::Available))
    }

    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.count(TopicStatus::is_locked)
    }

    fn count(&self, pred: impl Fn(&TopicStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// A single topic with the user's record and any prerequisites still missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDetail {
    pub topic: Topic,
    pub status: TopicStatus,
    pub record: Option<ProgressRecord>,
    /// Titles of the prerequisites still to complete, in declaration order.
    pub missing: Vec<(TopicId, String)>,
}

/// Builds per-user views of the topic catalogue.
#[derive(Clone)]
pub struct LearningMapService {
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl LearningMapService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        topics: Arc<dyn TopicRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            users,
            topics,
            progress,
        }
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, LearningMapError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(LearningMapError::UnknownUser(user_id))
    }

    /// Visible topics with their status and best score.
    ///
    /// # Errors
    ///
    /// Returns `LearningMapError::UnknownUser` if the user does not exist.
    /// Returns `LearningMapError::Storage` if repository access fails.
    pub async fn learning_map(&self, user_id: UserId) -> Result<LearningMap, LearningMapError> {
        let user = self.load_user(user_id).await?;
        let catalogue = self.topics.list_topics().await?;
        let records = self.progress.list_progress(user_id).await?;

        let completed: HashSet<TopicId> = records
            .iter()
            .filter(|r| r.completed())
            .map(ProgressRecord::topic_id)
            .collect();
        let best: HashMap<TopicId, Score> =
            records.iter().map(|r| (r.topic_id(), r.score())).collect();

        let mut visible: Vec<&Topic> = visible_topics(&user, &catalogue);
        let order = match PrerequisiteGraph::from_topics(&catalogue).topological_order() {
            Ok(order) => order,
            Err(err) => {
                warn!(error = %err, "topic catalogue has a prerequisite cycle; ordering by id");
                catalogue.iter().map(Topic::id).collect()
            }
        };
        let rank: HashMap<TopicId, usize> =
            order.into_iter().enumerate().map(|(i, id)| (id, i)).collect();
        visible.sort_by_key(|t| rank.get(&t.id()).copied().unwrap_or(usize::MAX));

        let entries: Vec<MapEntry> = visible
            .into_iter()
            .map(|topic| MapEntry {
                status: prerequisites::status(topic, &completed),
                best_score: best.get(&topic.id()).copied(),
                topic: topic.clone(),
            })
            .collect();

        debug!(
            user = %user_id,
            visible = entries.len(),
            catalogue = catalogue.len(),
            completed = completed.len(),
            "built learning map"
        );
        Ok(LearningMap { user, entries })
    }

    /// # Errors
    ///
    /// Returns `LearningMapError::UnknownUser` or `LearningMapError::UnknownTopic`
    /// for missing ids, `LearningMapError::Forbidden` if the user may not view
    /// the topic, and `LearningMapError::Storage` if repository access fails.
    pub async fn topic_detail(
        &self,
        user_id: UserId,
        topic_id: TopicId,
    ) -> Result<TopicDetail, LearningMapError> {
        let user = self.load_user(user_id).await?;
        let topic = self
            .topics
            .get_topic(topic_id)
            .await?
            .ok_or(LearningMapError::UnknownTopic(topic_id))?;
        if !can_view(&user, &topic) {
            return Err(LearningMapError::Forbidden {
                user: user_id,
                topic: topic_id,
            });
        }

        let completed = self.progress.completed_topics(user_id).await?;
        let record = self.progress.get_progress(user_id, topic_id).await?;
        let status = prerequisites::status(&topic, &completed);

        let mut missing = Vec::new();
        if let TopicStatus::Locked { missing: ids } = &status {
            for id in ids {
                let title = match self.topics.get_topic(*id).await? {
                    Some(t) => t.title().to_owned(),
                    None => format!("topic {id}"),
                };
                missing.push((*id, title));
            }
        }

        Ok(TopicDetail {
            topic,
            status,
            record,
            missing,
        })
    }
}
