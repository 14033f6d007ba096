use std::sync::Arc;

use quest_core::access::can_view;
use quest_core::level::LevelChange;
use quest_core::model::{AnswerMap, ProgressRecord, Score, TopicId, UserId};
use quest_core::prerequisites::{self, PrerequisiteGraph, TopicStatus};
use storage::repository::{ProgressRepository, TopicRepository, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of submitting a quiz score for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// The stored record after merging this attempt.
    pub record: ProgressRecord,
    /// Non-zero only on the attempt that first completes the topic.
    pub xp_awarded: u32,
    pub level_change: LevelChange,
    /// Visible topics that became available because of this completion.
    pub newly_unlocked: Vec<TopicId>,
}

impl SubmissionOutcome {
    #[must_use]
    pub fn newly_completed(&self) -> bool {
        self.xp_awarded > 0
    }
}

/// Records quiz results and awards XP.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        topics: Arc<dyn TopicRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            topics,
            progress,
        }
    }

    /// Store a quiz attempt for a student.
    ///
    /// The best score across attempts is kept. The topic's XP is awarded only
    /// on the attempt that first reaches the pass mark, and is stored in the
    /// same write as the completing record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownUser`/`UnknownTopic` for missing ids,
    /// `NotAStudent` for teachers, `Forbidden` if the topic is outside the
    /// student's grade, `Locked` if prerequisites are incomplete, and
    /// `Storage` if repository access fails.
    pub async fn submit_quiz(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        answers: AnswerMap,
        score: Score,
    ) -> Result<SubmissionOutcome, ProgressServiceError> {
        let mut user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ProgressServiceError::UnknownUser(user_id))?;
        if !user.is_student() {
            return Err(ProgressServiceError::NotAStudent(user_id));
        }
        let topic = self
            .topics
            .get_topic(topic_id)
            .await?
            .ok_or(ProgressServiceError::UnknownTopic(topic_id))?;
        if !can_view(&user, &topic) {
            return Err(ProgressServiceError::Forbidden {
                user: user_id,
                topic: topic_id,
            });
        }

        let mut completed = self.progress.completed_topics(user_id).await?;
        if let TopicStatus::Locked { missing } = prerequisites::status(&topic, &completed) {
            return Err(ProgressServiceError::Locked {
                topic: topic_id,
                missing,
            });
        }

        let now = self.clock.now();
        let (record, newly_completed) = match self.progress.get_progress(user_id, topic_id).await? {
            Some(mut record) => {
                let outcome = record.record_attempt(score, answers, now);
                (record, outcome.newly_completed)
            }
            None => {
                let record = ProgressRecord::first_attempt(user_id, topic_id, score, answers, now);
                let passed = record.completed();
                (record, passed)
            }
        };
        if !newly_completed {
            self.progress.upsert_progress(&record).await?;
            info!(user = %user_id, topic = %topic_id, score = %score, "recorded attempt");
            let level = user.level();
            return Ok(SubmissionOutcome {
                record,
                xp_awarded: 0,
                level_change: LevelChange {
                    previous: level,
                    current: level,
                },
                newly_unlocked: Vec::new(),
            });
        }

        let xp_awarded = topic.xp_reward();
        let level_change = user.award_xp(xp_awarded);
        self.progress.record_completion(&record, &user).await?;

        completed.insert(topic_id);
        let catalogue = self.topics.list_topics().await?;
        let graph = PrerequisiteGraph::from_topics(&catalogue);
        let newly_unlocked: Vec<TopicId> = graph
            .dependents(topic_id)
            .into_iter()
            .filter_map(|id| catalogue.iter().find(|t| t.id() == id))
            .filter(|t| can_view(&user, t))
            .filter(|t| prerequisites::status(t, &completed) == TopicStatus::Available)
            .map(|t| t.id())
            .collect();

        info!(
            user = %user_id,
            topic = %topic_id,
            score = %score,
            xp = xp_awarded,
            unlocked = newly_unlocked.len(),
            "completed topic"
        );
        if level_change.leveled_up() {
            info!(user = %user_id, level = level_change.current, "level up");
        }

        Ok(SubmissionOutcome {
            record,
            xp_awarded,
            level_change,
            newly_unlocked,
        })
    }

    /// All of a user's records ordered by topic id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        Ok(self.progress.list_progress(user_id).await?)
    }
}
