use quest_core::model::{Quiz, QuizId, QuizSource, TopicId, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::mapping::{id_from_i64, id_to_i64, questions_from_json, questions_to_json, ser};
use super::{SqliteRepository, db_err};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let author = quiz
            .source()
            .author()
            .map(|a| id_to_i64("author_id", a.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO quizzes (topic_id, title, source, author_id, questions)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("topic_id", quiz.topic_id().value())?)
        .bind(quiz.title())
        .bind(quiz.source().as_str())
        .bind(author)
        .bind(questions_to_json(quiz.questions())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(QuizId::new(id_from_i64("quiz_id", res.last_insert_rowid())?))
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, topic_id, title, source, author_id, questions
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(id_to_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref()
            .map(|r| quiz_from_row(r).map(|(_, quiz)| quiz))
            .transpose()
    }

    async fn quizzes_for_topic(&self, topic: TopicId) -> Result<Vec<(QuizId, Quiz)>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, topic_id, title, source, author_id, questions
            FROM quizzes
            WHERE topic_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("topic_id", topic.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(quiz_from_row).collect()
    }
}

fn quiz_from_row(row: &SqliteRow) -> Result<(QuizId, Quiz), StorageError> {
    let source_name: String = row.try_get("source").map_err(ser)?;
    let author = row
        .try_get::<Option<i64>, _>("author_id")
        .map_err(ser)?
        .map(|a| id_from_i64("author_id", a).map(UserId::new))
        .transpose()?;
    let questions: String = row.try_get("questions").map_err(ser)?;

    let quiz = Quiz::new(
        TopicId::new(id_from_i64("topic_id", row.try_get("topic_id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        QuizSource::from_parts(&source_name, author).map_err(ser)?,
        questions_from_json(&questions)?,
    )
    .map_err(ser)?;

    Ok((
        QuizId::new(id_from_i64("quiz_id", row.try_get("id").map_err(ser)?)?),
        quiz,
    ))
}
