use std::collections::HashMap;

use quest_core::model::{Topic, TopicCategory, TopicId, UserId, ValidatedTopic};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::mapping::{grade_to_i64, id_from_i64, id_to_i64, level_from_i64, ser, u32_from_i64};
use super::{SqliteRepository, db_err};
use crate::repository::{StorageError, TopicRepository};

async fn write_prerequisites(
    tx: &mut Transaction<'_, Sqlite>,
    topic: i64,
    prerequisites: &[TopicId],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM topic_prerequisites WHERE topic_id = ?1")
        .bind(topic)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    for (position, prereq) in prerequisites.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO topic_prerequisites (topic_id, prerequisite_id, position)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(topic)
        .bind(id_to_i64("topic_id", prereq.value())?)
        .bind(i64::try_from(position).map_err(ser)?)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

fn author_to_i64(author: Option<UserId>) -> Result<Option<i64>, StorageError> {
    author
        .map(|a| id_to_i64("author_id", a.value()))
        .transpose()
}

#[async_trait::async_trait]
impl TopicRepository for SqliteRepository {
    async fn insert_topic(&self, topic: &ValidatedTopic) -> Result<Topic, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO topics (title, description, grade, category, xp_reward, author_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(topic.title())
        .bind(topic.description())
        .bind(grade_to_i64(topic.level().grade()))
        .bind(topic.category().as_str())
        .bind(i64::from(topic.xp_reward()))
        .bind(author_to_i64(topic.author())?)
        .bind(topic.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let raw_id = res.last_insert_rowid();
        let stored = topic
            .clone()
            .assign_id(TopicId::new(id_from_i64("topic_id", raw_id)?))
            .map_err(ser)?;
        write_prerequisites(&mut tx, raw_id, stored.prerequisites()).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(stored)
    }

    async fn update_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let id = id_to_i64("topic_id", topic.id().value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            UPDATE topics
            SET title = ?2, description = ?3, grade = ?4, category = ?5, xp_reward = ?6, author_id = ?7
            WHERE id = ?1
            ",
        )
        .bind(id)
        .bind(topic.title())
        .bind(topic.description())
        .bind(grade_to_i64(topic.level().grade()))
        .bind(topic.category().as_str())
        .bind(i64::from(topic.xp_reward()))
        .bind(author_to_i64(topic.author())?)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        write_prerequisites(&mut tx, id, topic.prerequisites()).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let raw_id = id_to_i64("topic_id", id.value())?;
        let row = sqlx::query(
            r"
            SELECT id, title, description, grade, category, xp_reward, author_id, created_at
            FROM topics WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let edges = sqlx::query(
            r"
            SELECT topic_id, prerequisite_id
            FROM topic_prerequisites
            WHERE topic_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut prerequisites = group_edges(&edges)?;
        topic_from_row(&row, prerequisites.remove(&raw_id).unwrap_or_default()).map(Some)
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, grade, category, xp_reward, author_id, created_at
            FROM topics
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let edges = sqlx::query(
            r"
            SELECT topic_id, prerequisite_id
            FROM topic_prerequisites
            ORDER BY topic_id ASC, position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut prerequisites = group_edges(&edges)?;
        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            topics.push(topic_from_row(
                &row,
                prerequisites.remove(&id).unwrap_or_default(),
            )?);
        }
        Ok(topics)
    }
}

fn group_edges(rows: &[SqliteRow]) -> Result<HashMap<i64, Vec<TopicId>>, StorageError> {
    let mut grouped: HashMap<i64, Vec<TopicId>> = HashMap::new();
    for row in rows {
        let topic: i64 = row.try_get("topic_id").map_err(ser)?;
        let prereq: i64 = row.try_get("prerequisite_id").map_err(ser)?;
        grouped
            .entry(topic)
            .or_default()
            .push(TopicId::new(id_from_i64("prerequisite_id", prereq)?));
    }
    Ok(grouped)
}

fn topic_from_row(row: &SqliteRow, prerequisites: Vec<TopicId>) -> Result<Topic, StorageError> {
    let category: String = row.try_get("category").map_err(ser)?;
    let author = row
        .try_get::<Option<i64>, _>("author_id")
        .map_err(ser)?
        .map(|a| id_from_i64("author_id", a).map(UserId::new))
        .transpose()?;

    Topic::from_persisted(
        TopicId::new(id_from_i64("topic_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        level_from_i64(row.try_get("grade").map_err(ser)?)?,
        category.parse::<TopicCategory>().map_err(ser)?,
        u32_from_i64("xp_reward", row.try_get("xp_reward").map_err(ser)?)?,
        prerequisites,
        author,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
