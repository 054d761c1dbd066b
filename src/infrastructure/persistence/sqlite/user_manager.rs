//! SQLite User Manager

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::{ManagerError, ResourceManager};
use crate::domain::{Lookup, NewUser, Payload, Resource, ResourceKey, User, UserPatch};

/// SQLite User Manager
pub struct SqliteUserManager {
    pool: DbPool,
}

impl SqliteUserManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, key: ResourceKey) -> Result<Option<User>, ManagerError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password, created_at FROM users WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = ManagerError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| ManagerError::persistence(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ResourceManager for SqliteUserManager {
    type Entity = User;
    type Create = NewUser;
    type Patch = UserPatch;

    async fn create(&self, payload: NewUser) -> Result<User, ManagerError> {
        payload.validate().map_err(ManagerError::Validation)?;

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(&payload.password)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let user = User {
            id: result.last_insert_rowid(),
            username: payload.username,
            email: payload.email,
            password: payload.password,
            created_at,
        };

        tracing::info!(user_id = user.key(), username = %user.username, "User created");

        Ok(user)
    }

    async fn get_by_id(&self, key: ResourceKey) -> Result<Lookup<User>, ManagerError> {
        Ok(self.find(key).await?.into())
    }

    async fn get_all(&self) -> Result<Vec<User>, ManagerError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn update(&self, key: ResourceKey, patch: UserPatch) -> Result<User, ManagerError> {
        patch.validate().map_err(ManagerError::Validation)?;

        let mut user = self
            .find(key)
            .await?
            .ok_or_else(|| ManagerError::not_found(User::KIND, key))?;
        patch.apply(&mut user);

        let result =
            sqlx::query("UPDATE users SET username = ?, email = ?, password = ? WHERE id = ?")
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password)
                .bind(key)
                .execute(&self.pool)
                .await?;

        // 读取与写入之间被并发删除
        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(User::KIND, key));
        }

        tracing::info!(user_id = key, "User updated");

        Ok(user)
    }

    async fn remove(&self, key: ResourceKey) -> Result<(), ManagerError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(User::KIND, key));
        }

        tracing::info!(user_id = key, "User removed");

        Ok(())
    }
}
