use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::level::{LevelChange, level_for_xp};
use crate::model::grade::Grade;
use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyName,

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// What a user may do. Only students carry a grade and earn XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student { grade: Option<Grade> },
    Teacher,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student { .. } => "student",
            Role::Teacher => "teacher",
        }
    }

    /// Rebuild a role from its storage name and optional grade.
    ///
    /// A grade stored alongside a teacher is ignored.
    ///
    /// # Errors
    ///
    /// Returns `UserError::UnknownRole` for unrecognized names.
    pub fn from_parts(name: &str, grade: Option<Grade>) -> Result<Self, UserError> {
        match name {
            "student" => Ok(Role::Student { grade }),
            "teacher" => Ok(Role::Teacher),
            other => Err(UserError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub role: Role,
}

impl UserDraft {
    #[must_use]
    pub fn student(name: impl Into<String>, grade: Option<Grade>) -> Self {
        Self {
            name: name.into(),
            role: Role::Student { grade },
        }
    }

    #[must_use]
    pub fn teacher(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Teacher,
        }
    }

    /// # Errors
    ///
    /// Returns `UserError::EmptyName` if the trimmed name is empty.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedUser, UserError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }
        Ok(ValidatedUser {
            name,
            role: self.role,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser {
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl ValidatedUser {
    #[must_use]
    pub fn assign_id(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            role: self.role,
            xp: 0,
            created_at: self.created_at,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A student or teacher account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    role: Role,
    xp: u32,
    created_at: DateTime<Utc>,
}

impl User {
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` if the persisted name is blank.
    pub fn from_persisted(
        id: UserId,
        name: String,
        role: Role,
        xp: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let mut user = UserDraft { name, role }.validate(created_at)?.assign_id(id);
        user.xp = xp;
        Ok(user)
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        matches!(self.role, Role::Teacher)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        matches!(self.role, Role::Student { .. })
    }

    /// The student's grade; always `None` for teachers.
    #[must_use]
    pub fn grade(&self) -> Option<Grade> {
        match self.role {
            Role::Student { grade } => grade,
            Role::Teacher => None,
        }
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        level_for_xp(self.xp)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add XP (saturating) and report the level transition.
    pub fn award_xp(&mut self, amount: u32) -> LevelChange {
        let before = self.xp;
        self.xp = self.xp.saturating_add(amount);
        LevelChange::between(before, self.xp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn student(xp: u32) -> User {
        User::from_persisted(
            UserId::new(1),
            "Ada".into(),
            Role::Student {
                grade: Some(Grade::new(5).unwrap()),
            },
            xp,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_blank_name() {
        let err = UserDraft::teacher("  ").validate(fixed_now()).unwrap_err();
        assert_eq!(err, UserError::EmptyName);
    }

    #[test]
    fn new_users_start_at_level_one() {
        let user = UserDraft::student(" Ada ", None)
            .validate(fixed_now())
            .unwrap()
            .assign_id(UserId::new(3));
        assert_eq!(user.name(), "Ada");
        assert_eq!(user.xp(), 0);
        assert_eq!(user.level(), 1);
        assert!(user.is_student());
    }

    #[test]
    fn award_xp_reports_level_up() {
        let mut user = student(450);
        let change = user.award_xp(100);
        assert_eq!(user.xp(), 550);
        assert_eq!(change.previous, 1);
        assert_eq!(change.current, 2);
        assert!(change.leveled_up());
    }

    #[test]
    fn award_xp_saturates() {
        let mut user = student(u32::MAX - 1);
        user.award_xp(10);
        assert_eq!(user.xp(), u32::MAX);
    }

    #[test]
    fn teacher_has_no_grade() {
        let role = Role::from_parts("teacher", Grade::new(3).ok()).unwrap();
        assert_eq!(role, Role::Teacher);
        assert!(Role::from_parts("admin", None).is_err());
    }
}
