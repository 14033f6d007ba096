use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("grade must be between {MIN_GRADE} and {MAX_GRADE}, got {0}")]
    OutOfRange(u8),

    #[error("invalid grade level: {0}")]
    Unparseable(String),
}

/// School grade of a student (1 through 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    /// # Errors
    ///
    /// Returns `GradeError::OutOfRange` outside 1..=12.
    pub fn new(value: u8) -> Result<Self, GradeError> {
        if (MIN_GRADE..=MAX_GRADE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GradeError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Grade {
    type Error = GradeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grade {}", self.0)
    }
}

/// Audience of a topic: open to everyone or restricted to one grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradeLevel {
    #[default]
    Any,
    Grade(Grade),
}

impl GradeLevel {
    #[must_use]
    pub fn grade(self) -> Option<Grade> {
        match self {
            GradeLevel::Any => None,
            GradeLevel::Grade(g) => Some(g),
        }
    }

    #[must_use]
    pub fn is_restricted(self) -> bool {
        matches!(self, GradeLevel::Grade(_))
    }
}

impl From<Option<Grade>> for GradeLevel {
    fn from(value: Option<Grade>) -> Self {
        value.map_or(GradeLevel::Any, GradeLevel::Grade)
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeLevel::Any => f.write_str("All grades"),
            GradeLevel::Grade(g) => write!(f, "{g}"),
        }
    }
}

/// Accepts `any`, a bare number, or `grade N`.
impl FromStr for GradeLevel {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "any" || lowered == "all" {
            return Ok(GradeLevel::Any);
        }
        let digits = lowered.strip_prefix("grade").unwrap_or(&lowered).trim();
        let value: u8 = digits
            .parse()
            .map_err(|_| GradeError::Unparseable(s.to_string()))?;
        Ok(GradeLevel::Grade(Grade::new(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_rejects_out_of_range() {
        assert_eq!(Grade::new(0), Err(GradeError::OutOfRange(0)));
        assert_eq!(Grade::new(13), Err(GradeError::OutOfRange(13)));
        assert!(Grade::new(12).is_ok());
    }

    #[test]
    fn grade_level_parses_variants() {
        assert_eq!("any".parse::<GradeLevel>().unwrap(), GradeLevel::Any);
        assert_eq!(
            "Grade 4".parse::<GradeLevel>().unwrap(),
            GradeLevel::Grade(Grade::new(4).unwrap())
        );
        assert_eq!(
            "7".parse::<GradeLevel>().unwrap(),
            GradeLevel::Grade(Grade::new(7).unwrap())
        );
        assert!("grade x".parse::<GradeLevel>().is_err());
        assert!("20".parse::<GradeLevel>().is_err());
    }

    #[test]
    fn display_reads_naturally() {
        assert_eq!(GradeLevel::Any.to_string(), "All grades");
        let g = GradeLevel::Grade(Grade::new(3).unwrap());
        assert_eq!(g.to_string(), "Grade 3");
    }
}
