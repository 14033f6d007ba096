use quest_core::model::{Role, User, UserId, ValidatedUser};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::mapping::{grade_from_i64, grade_to_i64, id_from_i64, id_to_i64, ser, u32_from_i64};
use super::{SqliteRepository, db_err};
use crate::repository::{StorageError, UserRepository};

fn role_grade(role: Role) -> Option<i64> {
    match role {
        Role::Student { grade } => grade_to_i64(grade),
        Role::Teacher => None,
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: &ValidatedUser) -> Result<User, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (name, role, grade, xp, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            ",
        )
        .bind(user.name())
        .bind(user.role().as_str())
        .bind(role_grade(user.role()))
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = UserId::new(id_from_i64("user_id", res.last_insert_rowid())?);
        Ok(user.clone().assign_id(id))
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users SET name = ?2, role = ?3, grade = ?4, xp = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user.id().value())?)
        .bind(user.name())
        .bind(user.role().as_str())
        .bind(role_grade(user.role()))
        .bind(i64::from(user.xp()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, role, grade, xp, created_at
            FROM users WHERE id = ?1
            ",
        )
        .bind(id_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, role, grade, xp, created_at
            FROM users
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(user_from_row).collect()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role_name: String = row.try_get("role").map_err(ser)?;
    let grade = grade_from_i64(row.try_get::<Option<i64>, _>("grade").map_err(ser)?)?;
    let role = Role::from_parts(&role_name, grade).map_err(ser)?;

    User::from_persisted(
        UserId::new(id_from_i64("user_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        role,
        u32_from_i64("xp", row.try_get("xp").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
