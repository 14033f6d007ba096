#![forbid(unsafe_code)]

//! Domain model and rules for the MathQuest learning map.
//!
//! Everything here is synchronous and storage-agnostic: topics, users,
//! progress records, quizzes, the access policy that hides grade-restricted
//! topics, and the prerequisite resolver that decides lock state.

pub mod access;
pub mod level;
pub mod model;
pub mod prerequisites;
pub mod question_bank;
pub mod time;

pub use time::Clock;
