use std::collections::HashSet;

use quest_core::model::{ProgressRecord, Score, TopicId, User, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::mapping::{answers_from_json, answers_to_json, id_from_i64, id_to_i64, ser, u32_from_i64};
use super::{SqliteRepository, db_err};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        write_record(&mut tx, record).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn record_completion(
        &self,
        record: &ProgressRecord,
        user: &User,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        write_record(&mut tx, record).await?;

        let res = sqlx::query("UPDATE users SET xp = ?2 WHERE id = ?1")
            .bind(id_to_i64("user_id", user.id().value())?)
            .bind(i64::from(user.xp()))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, topic_id, score, completed_at, last_attempt_at, attempts, answers
            FROM progress
            WHERE user_id = ?1 AND topic_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .bind(id_to_i64("topic_id", topic.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn list_progress(&self, user: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, topic_id, score, completed_at, last_attempt_at, attempts, answers
            FROM progress
            WHERE user_id = ?1
            ORDER BY topic_id ASC
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(progress_from_row).collect()
    }

    async fn completed_topics(&self, user: UserId) -> Result<HashSet<TopicId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT topic_id FROM progress
            WHERE user_id = ?1 AND completed_at IS NOT NULL
            ",
        )
        .bind(id_to_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let raw: i64 = row.try_get("topic_id").map_err(ser)?;
                Ok(TopicId::new(id_from_i64("topic_id", raw)?))
            })
            .collect()
    }
}

async fn write_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &ProgressRecord,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO progress (user_id, topic_id, score, completed_at, last_attempt_at, attempts, answers)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(user_id, topic_id) DO UPDATE SET
            score = excluded.score,
            completed_at = excluded.completed_at,
            last_attempt_at = excluded.last_attempt_at,
            attempts = excluded.attempts,
            answers = excluded.answers
        ",
    )
    .bind(id_to_i64("user_id", record.user_id().value())?)
    .bind(id_to_i64("topic_id", record.topic_id().value())?)
    .bind(i64::from(record.score().value()))
    .bind(record.completed_at())
    .bind(record.last_attempt_at())
    .bind(i64::from(record.attempts()))
    .bind(answers_to_json(record.answers())?)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn progress_from_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let score = Score::new(u32_from_i64("score", row.try_get("score").map_err(ser)?)?)
        .map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;

    ProgressRecord::from_persisted(
        UserId::new(id_from_i64("user_id", row.try_get("user_id").map_err(ser)?)?),
        TopicId::new(id_from_i64("topic_id", row.try_get("topic_id").map_err(ser)?)?),
        score,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("last_attempt_at").map_err(ser)?,
        u32_from_i64("attempts", row.try_get("attempts").map_err(ser)?)?,
        answers_from_json(&answers)?,
    )
    .map_err(ser)
}
