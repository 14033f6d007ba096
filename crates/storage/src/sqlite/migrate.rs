use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('student', 'teacher')),
            grade INTEGER CHECK (grade IS NULL OR grade BETWEEN 1 AND 12),
            xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            grade INTEGER CHECK (grade IS NULL OR grade BETWEEN 1 AND 12),
            category TEXT NOT NULL,
            xp_reward INTEGER NOT NULL CHECK (xp_reward > 0),
            author_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS topic_prerequisites (
            topic_id INTEGER NOT NULL,
            prerequisite_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (topic_id, prerequisite_id),
            CHECK (topic_id <> prerequisite_id),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
            FOREIGN KEY (prerequisite_id) REFERENCES topics(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS progress (
            user_id INTEGER NOT NULL,
            topic_id INTEGER NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            completed_at TEXT,
            last_attempt_at TEXT NOT NULL,
            attempts INTEGER NOT NULL CHECK (attempts > 0),
            answers TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (user_id, topic_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS classrooms (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            teacher_id INTEGER NOT NULL,
            join_code TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY (teacher_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS classroom_members (
            classroom_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY (classroom_id, user_id),
            FOREIGN KEY (classroom_id) REFERENCES classrooms(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS classroom_topics (
            classroom_id INTEGER NOT NULL,
            topic_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (classroom_id, topic_id),
            FOREIGN KEY (classroom_id) REFERENCES classrooms(id) ON DELETE CASCADE,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            topic_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            source TEXT NOT NULL CHECK (source IN ('teacher', 'bank', 'generated')),
            author_id INTEGER,
            questions TEXT NOT NULL,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_progress_user_completed
            ON progress (user_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_classroom_members_user
            ON classroom_members (user_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quizzes_topic
            ON quizzes (topic_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_users_xp
            ON users (role, xp DESC, name);
    ",
];

/// Applies versioned schema migrations, recording each in `schema_migrations`.
///
/// Version 1 creates users, the topic catalogue with its prerequisite edges,
/// progress records, classrooms and quizzes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
