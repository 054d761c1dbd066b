//! SQLite Team Manager

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::{ManagerError, ResourceManager};
use crate::domain::{Lookup, NewTeam, Payload, Resource, ResourceKey, Team, TeamPatch};

/// SQLite Team Manager
pub struct SqliteTeamManager {
    pool: DbPool,
}

impl SqliteTeamManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(&self, key: ResourceKey) -> Result<Option<Team>, ManagerError> {
        let row: Option<TeamRow> =
            sqlx::query_as("SELECT id, name, description, created_at FROM teams WHERE id = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Team::try_from).transpose()
    }
}

#[derive(FromRow)]
struct TeamRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl TryFrom<TeamRow> for Team {
    type Error = ManagerError;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        Ok(Team {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| ManagerError::persistence(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ResourceManager for SqliteTeamManager {
    type Entity = Team;
    type Create = NewTeam;
    type Patch = TeamPatch;

    async fn create(&self, payload: NewTeam) -> Result<Team, ManagerError> {
        payload.validate().map_err(ManagerError::Validation)?;

        let created_at = Utc::now();
        let description = payload.description.filter(|d| !d.is_empty());
        let result =
            sqlx::query("INSERT INTO teams (name, description, created_at) VALUES (?, ?, ?)")
                .bind(&payload.name)
                .bind(&description)
                .bind(created_at.to_rfc3339())
                .execute(&self.pool)
                .await?;

        let team = Team {
            id: result.last_insert_rowid(),
            name: payload.name,
            description,
            created_at,
        };

        tracing::info!(team_id = team.key(), name = %team.name, "Team created");

        Ok(team)
    }

    async fn get_by_id(&self, key: ResourceKey) -> Result<Lookup<Team>, ManagerError> {
        Ok(self.find(key).await?.into())
    }

    async fn get_all(&self) -> Result<Vec<Team>, ManagerError> {
        let rows: Vec<TeamRow> =
            sqlx::query_as("SELECT id, name, description, created_at FROM teams ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Team::try_from).collect()
    }

    async fn update(&self, key: ResourceKey, patch: TeamPatch) -> Result<Team, ManagerError> {
        patch.validate().map_err(ManagerError::Validation)?;

        let mut team = self
            .find(key)
            .await?
            .ok_or_else(|| ManagerError::not_found(Team::KIND, key))?;
        patch.apply(&mut team);

        let result = sqlx::query("UPDATE teams SET name = ?, description = ? WHERE id = ?")
            .bind(&team.name)
            .bind(&team.description)
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(Team::KIND, key));
        }

        tracing::info!(team_id = key, "Team updated");

        Ok(team)
    }

    async fn remove(&self, key: ResourceKey) -> Result<(), ManagerError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ManagerError::not_found(Team::KIND, key));
        }

        tracing::info!(team_id = key, "Team removed");

        Ok(())
    }
}
