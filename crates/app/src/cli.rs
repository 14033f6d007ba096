use clap::{Parser, Subcommand};
use quest_core::model::{Difficulty, TopicId, UserId};

const DEFAULT_DB_URL: &str = "sqlite://mathquest.sqlite3?mode=rwc";

#[derive(Debug, Parser)]
#[command(name = "mathquest")]
#[command(version, about = "Gamified math learning map")]
pub struct Cli {
    /// Database URL
    #[arg(long = "db", global = true, env = "MATHQUEST_DB_URL", default_value = DEFAULT_DB_URL)]
    pub db_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create demo users, topics and a classroom
    Seed,

    /// List users
    Users,

    /// Show a user's learning map
    Map {
        #[arg(long)]
        user: UserId,
    },

    /// Show one topic as a user sees it
    Topic {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        topic: TopicId,
    },

    /// Take a quiz and record the result
    Quiz {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        topic: TopicId,
        /// Number of questions
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// easy, medium or hard (any when omitted)
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Chosen option per question, comma separated (prompts when omitted)
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<usize>>,
    },

    /// Join a classroom with its code
    Join {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        code: String,
    },

    /// Show level and XP for a user
    Profile {
        #[arg(long)]
        user: UserId,
    },

    /// Top students by XP
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Question bank statistics
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_quiz_answers() {
        let cli = Cli::try_parse_from([
            "mathquest",
            "--db",
            "sqlite::memory:",
            "quiz",
            "--user",
            "2",
            "--topic",
            "4",
            "--difficulty",
            "hard",
            "--answers",
            "0,2,1",
        ])
        .unwrap();
        assert_eq!(cli.db_url, "sqlite::memory:");
        match cli.command {
            Command::Quiz {
                user,
                topic,
                difficulty,
                answers,
                count,
            } => {
                assert_eq!(user, UserId::new(2));
                assert_eq!(topic, TopicId::new(4));
                assert_eq!(difficulty, Some(Difficulty::Hard));
                assert_eq!(answers, Some(vec![0, 2, 1]));
                assert_eq!(count, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
