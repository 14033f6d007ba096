//! Persistence for users, topics, progress, classrooms and quizzes.
//!
//! Services talk to the repository traits in [`repository`]; the
//! [`sqlite`] module provides the durable backend and
//! [`repository::InMemoryRepository`] the one used in tests.

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
