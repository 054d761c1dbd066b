//! User - 用户资源

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{Payload, Resource, ResourceKey};

const MAX_USERNAME_LEN: usize = 50;

/// 用户实体
///
/// 不变量:
/// - password 永远不会出现在任何投影中
#[derive(Clone)]
pub struct User {
    pub id: ResourceKey,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 查询投影
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: ResourceKey,
    pub username: String,
    pub email: String,
}

/// 创建 / 更新投影
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: ResourceKey,
    pub username: String,
}

impl Resource for User {
    const KIND: &'static str = "user";

    type View = UserView;
    type Summary = UserSummary;

    fn key(&self) -> ResourceKey {
        self.id
    }

    fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// 创建用户载荷
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Payload for NewUser {
    fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// 部分更新载荷，只更新出现的字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }

    /// 将补丁应用到现有实体
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password) = self.password {
            user.password = password;
        }
    }
}

impl Payload for UserPatch {
    fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("update payload must contain at least one field".to_string());
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<(), String> {
    let len = username.trim().chars().count();
    if len == 0 {
        return Err("username cannot be empty".to_string());
    }
    if len > MAX_USERNAME_LEN {
        return Err(format!(
            "username cannot exceed {} characters",
            MAX_USERNAME_LEN
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(format!("invalid email address: {}", email)),
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password cannot be empty".to_string());
    }
    Ok(())
}
