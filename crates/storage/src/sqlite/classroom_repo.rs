use quest_core::model::{Classroom, ClassroomId, JoinCode, TopicId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::mapping::{id_from_i64, id_to_i64, ser};
use super::{SqliteRepository, db_err};
use crate::repository::{ClassroomRepository, NewClassroomRecord, StorageError};

const SELECT_CLASSROOM: &str = "SELECT id, name, teacher_id, join_code, created_at FROM classrooms";

impl SqliteRepository {
    async fn load_classroom(&self, row: &SqliteRow) -> Result<Classroom, StorageError> {
        let raw_id: i64 = row.try_get("id").map_err(ser)?;

        let members = sqlx::query(
            "SELECT user_id FROM classroom_members WHERE classroom_id = ?1 ORDER BY user_id ASC",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|r| {
            let id: i64 = r.try_get("user_id").map_err(ser)?;
            id_from_i64("user_id", id).map(UserId::new)
        })
        .collect::<Result<Vec<_>, _>>()?;

        let topics = sqlx::query(
            "SELECT topic_id FROM classroom_topics WHERE classroom_id = ?1 ORDER BY position ASC",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|r| {
            let id: i64 = r.try_get("topic_id").map_err(ser)?;
            id_from_i64("topic_id", id).map(TopicId::new)
        })
        .collect::<Result<Vec<_>, _>>()?;

        let code: String = row.try_get("join_code").map_err(ser)?;
        let teacher: i64 = row.try_get("teacher_id").map_err(ser)?;

        Classroom::from_persisted(
            ClassroomId::new(id_from_i64("classroom_id", raw_id)?),
            row.try_get::<String, _>("name").map_err(ser)?,
            UserId::new(id_from_i64("teacher_id", teacher)?),
            JoinCode::parse(&code).map_err(ser)?,
            members,
            topics,
            row.try_get("created_at").map_err(ser)?,
        )
        .map_err(ser)
    }

    async fn load_all(&self, rows: Vec<SqliteRow>) -> Result<Vec<Classroom>, StorageError> {
        let mut classrooms = Vec::with_capacity(rows.len());
        for row in &rows {
            classrooms.push(self.load_classroom(row).await?);
        }
        Ok(classrooms)
    }
}

async fn write_links(
    tx: &mut Transaction<'_, Sqlite>,
    classroom: &Classroom,
) -> Result<(), StorageError> {
    let id = id_to_i64("classroom_id", classroom.id().value())?;

    sqlx::query("DELETE FROM classroom_members WHERE classroom_id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    for member in classroom.members() {
        sqlx::query("INSERT INTO classroom_members (classroom_id, user_id) VALUES (?1, ?2)")
            .bind(id)
            .bind(id_to_i64("user_id", member.value())?)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }

    sqlx::query("DELETE FROM classroom_topics WHERE classroom_id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    for (position, topic) in classroom.topics().iter().enumerate() {
        sqlx::query(
            "INSERT INTO classroom_topics (classroom_id, topic_id, position) VALUES (?1, ?2, ?3)",
        )
        .bind(id)
        .bind(id_to_i64("topic_id", topic.value())?)
        .bind(i64::try_from(position).map_err(ser)?)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ClassroomRepository for SqliteRepository {
    async fn insert_classroom(
        &self,
        record: NewClassroomRecord,
    ) -> Result<Classroom, StorageError> {
        if record.name.trim().is_empty() {
            return Err(StorageError::Serialization("empty classroom name".into()));
        }
        let res = sqlx::query(
            r"
            INSERT INTO classrooms (name, teacher_id, join_code, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(record.name.trim())
        .bind(id_to_i64("teacher_id", record.teacher_id.value())?)
        .bind(record.join_code.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = ClassroomId::new(id_from_i64("classroom_id", res.last_insert_rowid())?);
        Classroom::new(
            id,
            record.name,
            record.teacher_id,
            record.join_code,
            record.created_at,
        )
        .map_err(ser)
    }

    async fn update_classroom(&self, classroom: &Classroom) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query("UPDATE classrooms SET name = ?2 WHERE id = ?1")
            .bind(id_to_i64("classroom_id", classroom.id().value())?)
            .bind(classroom.name())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        write_links(&mut tx, classroom).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_classroom(&self, id: ClassroomId) -> Result<Option<Classroom>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_CLASSROOM} WHERE id = ?1"))
            .bind(id_to_i64("classroom_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => self.load_classroom(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_join_code(&self, code: &JoinCode) -> Result<Option<Classroom>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_CLASSROOM} WHERE join_code = ?1"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => self.load_classroom(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn classrooms_for_user(&self, user: UserId) -> Result<Vec<Classroom>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            {SELECT_CLASSROOM}
            WHERE teacher_id = ?1
               OR id IN (SELECT classroom_id FROM classroom_members WHERE user_id = ?1)
            ORDER BY id ASC
            "
        ))
        .bind(id_to_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        self.load_all(rows).await
    }
}
