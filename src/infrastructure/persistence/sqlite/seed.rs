//! Seed Data - 初始用户数据导入

use std::path::Path;

use thiserror::Error;

use super::SqliteUserManager;
use crate::application::{ManagerError, ResourceManager};
use crate::domain::NewUser;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to insert seed user: {0}")]
    Manager(#[from] ManagerError),
}

/// 从 JSON 数组文件导入用户
///
/// 用户名冲突的记录会被跳过，返回实际插入的条数
pub async fn seed_users(manager: &SqliteUserManager, path: &Path) -> Result<usize, SeedError> {
    let content = tokio::fs::read_to_string(path).await?;
    let users: Vec<NewUser> = serde_json::from_str(&content)?;
    let total = users.len();

    let mut inserted = 0;
    for user in users {
        let username = user.username.clone();
        match manager.create(user).await {
            Ok(_) => inserted += 1,
            Err(ManagerError::Conflict(_)) => {
                tracing::debug!(username = %username, "Seed user already exists, skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        path = %path.display(),
        inserted,
        skipped = total - inserted,
        "Seed users imported"
    );

    Ok(inserted)
}
