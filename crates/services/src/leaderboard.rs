use std::sync::Arc;

use quest_core::model::{User, UserId};
use storage::repository::UserRepository;

use crate::error::UserServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based; students with equal XP share a rank.
    pub rank: u32,
    pub user_id: UserId,
    pub name: String,
    pub xp: u32,
    pub level: u32,
}

/// Ranks students by XP.
#[derive(Clone)]
pub struct LeaderboardService {
    users: Arc<dyn UserRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// The `limit` highest-XP students, ties broken by name.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, UserServiceError> {
        let users = self.users.list_users().await?;
        Ok(rank_students(users, limit))
    }
}

fn rank_students(users: Vec<User>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut students: Vec<User> = users.into_iter().filter(User::is_student).collect();
    students.sort_by(|a, b| b.xp().cmp(&a.xp()).then_with(|| a.name().cmp(b.name())));

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(limit.min(students.len()));
    for (position, user) in students.into_iter().take(limit).enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.xp == user.xp() => prev.rank,
            _ => u32::try_from(position + 1).unwrap_or(u32::MAX),
        };
        entries.push(LeaderboardEntry {
            rank,
            user_id: user.id(),
            level: user.level(),
            xp: user.xp(),
            name: user.name().to_owned(),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    use quest_core::model::Role;
    use quest_core::time::fixed_now;

    fn student(id: u64, name: &str, xp: u32) -> User {
        User::from_persisted(
            UserId::new(id),
            name.into(),
            Role::Student { grade: None },
            xp,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn orders_by_xp_then_name_with_shared_ranks() {
        let teacher =
            User::from_persisted(UserId::new(9), "Teach".into(), Role::Teacher, 0, fixed_now())
                .unwrap();
        let users = vec![
            student(1, "Cleo", 300),
            student(2, "Ada", 1_200),
            teacher,
            student(3, "Ben", 300),
            student(4, "Dan", 50),
        ];

        let board = rank_students(users, 10);
        let rows: Vec<(u32, &str, u32)> = board
            .iter()
            .map(|e| (e.rank, e.name.as_str(), e.level))
            .collect();
        assert_eq!(
            rows,
            vec![(1, "Ada", 3), (2, "Ben", 1), (2, "Cleo", 1), (4, "Dan", 1)]
        );
    }

    #[test]
    fn limit_truncates() {
        let users = vec![student(1, "A", 10), student(2, "B", 20), student(3, "C", 30)];
        let board = rank_students(users, 2);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "C");
        assert!(rank_students(Vec::new(), 5).is_empty());
    }
}
