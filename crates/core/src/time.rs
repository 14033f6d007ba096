use chrono::{DateTime, Utc};

/// Where services read "now" from when stamping attempts, completions and
/// new records. Tests pin it with `Clock::Fixed(fixed_now())`.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// 2023-11-14T22:13:20Z as a `DateTime<Utc>`, shared by tests across crates.
///
/// # Panics
///
/// Panics if the timestamp cannot be represented, which chrono rules out for
/// this value.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp in chrono range")
}
