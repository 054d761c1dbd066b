//! 应用层错误定义
//!
//! Resource Manager 的统一错误类型

use thiserror::Error;

use crate::domain::ResourceKey;

/// Manager 错误
#[derive(Debug, Clone, Error)]
pub enum ManagerError {
    /// 载荷无法转换为实体
    #[error("Validation error: {0}")]
    Validation(String),

    /// 主键不存在
    #[error("{resource} not found: {key}")]
    NotFound {
        resource: &'static str,
        key: ResourceKey,
    },

    /// 唯一约束冲突
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 存储层错误（连接、约束等）
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ManagerError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 创建 NotFound 错误
    pub fn not_found(resource: &'static str, key: ResourceKey) -> Self {
        Self::NotFound { resource, key }
    }

    /// 创建存储错误
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<sqlx::Error> for ManagerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.message().to_string())
            }
            _ => Self::Persistence(err.to_string()),
        }
    }
}
