use std::sync::Arc;

use quest_core::level::{xp_into_level, xp_to_next_level};
use quest_core::model::{User, UserDraft, UserId};
use storage::repository::{ProgressRepository, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::UserServiceError;

/// A user with derived level information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user: User,
    pub level: u32,
    pub xp_into_level: u32,
    pub xp_to_next_level: u32,
    pub completed_topics: usize,
}

/// Account registration and profile lookup.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            progress,
        }
    }

    /// Validate and store a new student or teacher account.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::User` for validation failures.
    /// Returns `UserServiceError::Storage` if persistence fails.
    pub async fn register(&self, draft: UserDraft) -> Result<User, UserServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let user = self.users.insert_user(&validated).await?;
        info!(user = %user.id(), role = user.role().as_str(), "registered user");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `UserServiceError::UnknownUser` if the user does not exist.
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn profile(&self, user_id: UserId) -> Result<Profile, UserServiceError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(UserServiceError::UnknownUser(user_id))?;
        let completed_topics = self.progress.completed_topics(user_id).await?.len();
        let xp = user.xp();
        Ok(Profile {
            level: user.level(),
            xp_into_level: xp_into_level(xp),
            xp_to_next_level: xp_to_next_level(xp),
            completed_topics,
            user,
        })
    }

    /// All users ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.users.list_users().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quest_core::model::Grade;
    use quest_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> UserService {
        let repo = InMemoryRepository::new();
        UserService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
    }

    #[tokio::test]
    async fn new_student_starts_at_level_one() {
        let service = service();
        let user = service
            .register(UserDraft::student("Ada", Some(Grade::new(3).unwrap())))
            .await
            .unwrap();

        let profile = service.profile(user.id()).await.unwrap();
        assert_eq!(profile.level, 1);
        assert_eq!(profile.xp_into_level, 0);
        assert_eq!(profile.xp_to_next_level, 500);
        assert_eq!(profile.completed_topics, 0);
        assert_eq!(profile.user.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = service()
            .register(UserDraft::teacher("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::User(_)));
    }

    #[tokio::test]
    async fn profile_of_missing_user_is_an_error() {
        let err = service().profile(UserId::new(9)).await.unwrap_err();
        assert!(matches!(err, UserServiceError::UnknownUser(id) if id == UserId::new(9)));
    }
}
