//! Match Log - 对局记录资源
//!
//! 对应前端的 match-three / match-four 两种对局页面

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{Payload, Resource, ResourceKey};

/// 对局模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// 三人对局
    Three,
    /// 四人对局
    Four,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Three => "three",
            MatchMode::Four => "four",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "three" => Some(MatchMode::Three),
            "four" => Some(MatchMode::Four),
            _ => None,
        }
    }
}

/// 对局记录实体
#[derive(Debug, Clone)]
pub struct MatchLog {
    pub id: ResourceKey,
    pub mode: MatchMode,
    pub team_id: ResourceKey,
    pub score: i64,
    pub memo: Option<String>,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MatchLogView {
    pub id: ResourceKey,
    pub mode: MatchMode,
    pub team_id: ResourceKey,
    pub score: i64,
    pub memo: Option<String>,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MatchLogSummary {
    pub id: ResourceKey,
    pub mode: MatchMode,
    pub score: i64,
}

impl Resource for MatchLog {
    const KIND: &'static str = "match log";

    type View = MatchLogView;
    type Summary = MatchLogSummary;

    fn key(&self) -> ResourceKey {
        self.id
    }

    fn view(&self) -> MatchLogView {
        MatchLogView {
            id: self.id,
            mode: self.mode,
            team_id: self.team_id,
            score: self.score,
            memo: self.memo.clone(),
            played_at: self.played_at,
        }
    }

    fn summary(&self) -> MatchLogSummary {
        MatchLogSummary {
            id: self.id,
            mode: self.mode,
            score: self.score,
        }
    }
}

/// 创建对局记录载荷
#[derive(Debug, Clone, Deserialize)]
pub struct NewMatchLog {
    pub mode: MatchMode,
    pub team_id: ResourceKey,
    pub score: i64,
    #[serde(default)]
    pub memo: Option<String>,
    /// 缺省为当前时间
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
}

impl Payload for NewMatchLog {
    fn validate(&self) -> Result<(), String> {
        validate_team_id(self.team_id)?;
        validate_score(self.score)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchLogPatch {
    pub mode: Option<MatchMode>,
    pub team_id: Option<ResourceKey>,
    pub score: Option<i64>,
    pub memo: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchLogPatch {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.team_id.is_none()
            && self.score.is_none()
            && self.memo.is_none()
            && self.played_at.is_none()
    }

    pub fn apply(self, log: &mut MatchLog) {
        if let Some(mode) = self.mode {
            log.mode = mode;
        }
        if let Some(team_id) = self.team_id {
            log.team_id = team_id;
        }
        if let Some(score) = self.score {
            log.score = score;
        }
        if let Some(memo) = self.memo {
            log.memo = Some(memo).filter(|m| !m.is_empty());
        }
        if let Some(played_at) = self.played_at {
            log.played_at = played_at;
        }
    }
}

impl Payload for MatchLogPatch {
    fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("update payload must contain at least one field".to_string());
        }
        if let Some(team_id) = self.team_id {
            validate_team_id(team_id)?;
        }
        if let Some(score) = self.score {
            validate_score(score)?;
        }
        Ok(())
    }
}

fn validate_team_id(team_id: ResourceKey) -> Result<(), String> {
    if team_id <= 0 {
        return Err(format!("invalid team id: {}", team_id));
    }
    Ok(())
}

fn validate_score(score: i64) -> Result<(), String> {
    if score < 0 {
        return Err("score cannot be negative".to_string());
    }
    Ok(())
}
