//! Team - 队伍资源

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{Payload, Resource, ResourceKey};

const MAX_NAME_LEN: usize = 100;

/// 队伍实体
#[derive(Debug, Clone)]
pub struct Team {
    pub id: ResourceKey,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TeamView {
    pub id: ResourceKey,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamSummary {
    pub id: ResourceKey,
    pub name: String,
}

impl Resource for Team {
    const KIND: &'static str = "team";

    type View = TeamView;
    type Summary = TeamSummary;

    fn key(&self) -> ResourceKey {
        self.id
    }

    fn view(&self) -> TeamView {
        TeamView {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    fn summary(&self) -> TeamSummary {
        TeamSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// 创建队伍载荷
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Payload for NewTeam {
    fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)
    }
}

/// 部分更新载荷
///
/// `description` 为 null 时不做修改，清空描述需传空字符串
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TeamPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn apply(self, team: &mut Team) {
        if let Some(name) = self.name {
            team.name = name;
        }
        if let Some(description) = self.description {
            team.description = Some(description).filter(|d| !d.is_empty());
        }
    }
}

impl Payload for TeamPatch {
    fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("update payload must contain at least one field".to_string());
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err("team name cannot be empty".to_string());
    }
    if len > MAX_NAME_LEN {
        return Err(format!("team name cannot exceed {} characters", MAX_NAME_LEN));
    }
    Ok(())
}
