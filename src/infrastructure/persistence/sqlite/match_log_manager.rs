//! SQLite Match Log Manager

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::{ManagerError, ResourceManager};
use crate::domain::{
    Lookup, MatchLog, MatchLogPatch, MatchMode, NewMatchLog, Payload, Resource, ResourceKey,
};

/// SQLite Match Log Manager
pub struct SqliteMatchLogManager {
    pool: DbPool,
}

impl SqliteMatchLogManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, key: ResourceKey) -> Result<Option<MatchLog>, ManagerError> {
        let row: Option<MatchLogRow> = sqlx::query_as(
            "SELECT id, mode, team_id, score, memo, played_at FROM match_logs WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MatchLog::try_from).transpose()
    }
}

#[derive(FromRow)]
struct MatchLogRow {
    id: i64,
    mode: String,
    team_id: i64,
    score: i64,
    memo: Option<String>,
    played_at: String,
}

impl TryFrom<MatchLogRow> for MatchLog {
    type Error = ManagerError;

    fn try_from(row: MatchLogRow) -> Result<Self, Self::Error> {
        Ok(MatchLog {
            id: row.id,
            mode: MatchMode::from_str(&row.mode).ok_or_else(|| {
                ManagerError::persistence(format!("unknown match mode: {}", row.mode))
            })?,
            team_id: row.team_id,
            score: row.score,
            memo: row.memo,
            played_at: DateTime::parse_from_rfc3339(&row.played_at)
                .map_err(|e| ManagerError::persistence(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ResourceManager for SqliteMatchLogManager {
    type Entity = MatchLog;
    type Create = NewMatchLog;
    type Patch = MatchLogPatch;

    async fn create(&self, payload: NewMatchLog) -> Result<MatchLog, ManagerError> {
        payload.validate().map_err(ManagerError::Validation)?;

        let played_at = payload.played_at.unwrap_or_else(Utc::now);
        let memo = payload.memo.filter(|m| !m.is_empty());
        let result = sqlx::query(
            "INSERT INTO match_logs (mode, team_id, score, memo, played_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(payload.mode.as_str())
        .bind(payload.team_id)
        .bind(payload.score)
        .bind(&memo)
        .bind(played_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let log = MatchLog {
            id: result.last_insert_rowid(),
            mode: payload.mode,
            team_id: payload.team_id,
            score: payload.score,
            memo,
            played_at,
        };

        tracing::info!(
            match_log_id = log.key(),
            mode = log.mode.as_str(),
            team_id = log.team_id,
            "Match log created"
        );

        Ok(log)
    }

    async fn get_by_id(&self, key: ResourceKey) -> Result<Lookup<MatchLog>, ManagerError> {
        Ok(self.find(key).await?.into())
    }

    async fn get_all(&self) -> Result<Vec<MatchLog>, ManagerError> {
        let rows: Vec<MatchLogRow> = sqlx::query_as(
            "SELECT id, mode, team_id, score, memo, played_at FROM match_logs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MatchLog::try_from).collect()
    }

    async fn update(
        &self,
        key: ResourceKey,
        patch: MatchLogPatch,
    ) -> Result<MatchLog, ManagerError> {
        patch.validate().map_err(ManagerError::Validation)?;

        let mut log = self
            .find(key)
            .await?
            .ok_or_else(|| ManagerError::not_found(MatchLog::KIND, key))?;
        patch.apply(&mut log);

        let result = sqlx::query(
            "UPDATE match_logs SET mode = ?, team_id = ?, score = ?, memo = ?, played_at = ? WHERE id = ?",
        )
        .bind(log.mode.as_str())
        .bind(log.team_id)
        .bind(log.score)
        .bind(&log.memo)
        .bind(log.played_at.to_rfc3339())
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(MatchLog::KIND, key));
        }

        tracing::info!(match_log_id = key, "Match log updated");

        Ok(log)
    }

    async fn remove(&self, key: ResourceKey) -> Result<(), ManagerError> {
        let result = sqlx::query("DELETE FROM match_logs WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(MatchLog::KIND, key));
        }

        tracing::info!(match_log_id = key, "Match log removed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn manager() -> SqliteMatchLogManager {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteMatchLogManager::new(pool)
    }

    #[tokio::test]
    async fn test_create_defaults_played_at() {
        let manager = manager().await;
        let before = Utc::now();

        let log = manager
            .create(NewMatchLog {
                mode: MatchMode::Three,
                team_id: 1,
                score: 35000,
                memo: None,
                played_at: None,
            })
            .await
            .unwrap();

        assert!(log.played_at >= before);
        let Lookup::Found(found) = manager.get_by_id(log.id).await.unwrap() else {
            panic!("entity {} not found", log.id);
        };
        assert_eq!(found.mode, MatchMode::Three);
        assert_eq!(found.score, 35000);
    }

    #[tokio::test]
    async fn test_patch_mode_only() {
        let manager = manager().await;
        let log = manager
            .create(NewMatchLog {
                mode: MatchMode::Three,
                team_id: 3,
                score: 100,
                memo: Some("south round".to_string()),
                played_at: None,
            })
            .await
            .unwrap();

        manager
            .update(
                log.id,
                MatchLogPatch {
                    mode: Some(MatchMode::Four),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let Lookup::Found(found) = manager.get_by_id(log.id).await.unwrap() else {
            panic!("entity {} not found", log.id);
        };
        assert_eq!(found.mode, MatchMode::Four);
        assert_eq!(found.team_id, 3);
        assert_eq!(found.score, 100);
        assert_eq!(found.memo.as_deref(), Some("south round"));
        assert_eq!(found.played_at, log.played_at);
    }

    #[tokio::test]
    async fn test_missing_key_reports_resource_kind() {
        let manager = manager().await;

        let err = manager.remove(7).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::NotFound { resource, key: 7 } if resource == MatchLog::KIND
        ));
        assert_eq!(err.to_string(), "match log not found: 7");
    }
}
