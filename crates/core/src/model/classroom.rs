use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::model::ids::{ClassroomId, TopicId, UserId};

pub const JOIN_CODE_LEN: usize = 6;

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassroomError {
    #[error("classroom name cannot be empty")]
    EmptyName,

    #[error("invalid join code: {0}")]
    InvalidJoinCode(String),
}

/// Short code students type to join a classroom.
///
/// Always `JOIN_CODE_LEN` uppercase ASCII letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinCode(String);

impl JoinCode {
    /// Parse user input, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ClassroomError::InvalidJoinCode` for the wrong length or characters.
    pub fn parse(raw: &str) -> Result<Self, ClassroomError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == JOIN_CODE_LEN
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if valid {
            Ok(Self(code))
        } else {
            Err(ClassroomError::InvalidJoinCode(raw.to_string()))
        }
    }

    /// Random code drawn from an alphabet without look-alike characters.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..JOIN_CODE_LEN)
            .map(|_| char::from(JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())]))
            .collect();
        Self(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A teacher's class: members and the topics assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classroom {
    id: ClassroomId,
    name: String,
    teacher_id: UserId,
    join_code: JoinCode,
    members: BTreeSet<UserId>,
    topics: Vec<TopicId>,
    created_at: DateTime<Utc>,
}

impl Classroom {
    /// # Errors
    ///
    /// Returns `ClassroomError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: ClassroomId,
        name: impl Into<String>,
        teacher_id: UserId,
        join_code: JoinCode,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ClassroomError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ClassroomError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            teacher_id,
            join_code,
            members: BTreeSet::new(),
            topics: Vec::new(),
            created_at,
        })
    }

    /// # Errors
    ///
    /// Returns `ClassroomError::EmptyName` if the persisted name is blank.
    pub fn from_persisted(
        id: ClassroomId,
        name: String,
        teacher_id: UserId,
        join_code: JoinCode,
        members: impl IntoIterator<Item = UserId>,
        topics: impl IntoIterator<Item = TopicId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ClassroomError> {
        let mut classroom = Self::new(id, name, teacher_id, join_code, created_at)?;
        classroom.members = members.into_iter().collect();
        for topic in topics {
            classroom.assign_topic(topic);
        }
        Ok(classroom)
    }

    /// Returns `false` if the user was already a member.
    pub fn add_member(&mut self, user: UserId) -> bool {
        self.members.insert(user)
    }

    /// Returns `false` if the topic was already assigned.
    pub fn assign_topic(&mut self, topic: TopicId) -> bool {
        if self.topics.contains(&topic) {
            return false;
        }
        self.topics.push(topic);
        true
    }

    #[must_use]
    pub fn has_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    #[must_use]
    pub fn id(&self) -> ClassroomId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn teacher_id(&self) -> UserId {
        self.teacher_id
    }

    #[must_use]
    pub fn join_code(&self) -> &JoinCode {
        &self.join_code
    }

    #[must_use]
    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    #[must_use]
    pub fn topics(&self) -> &[TopicId] {
        &self.topics
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
