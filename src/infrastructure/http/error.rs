//! HTTP Error Handling
//!
//! Handler 不在本地渲染错误：`ApiError` 转换出的响应只是占位，
//! 错误本身挂在响应扩展（`ForwardedError`）上，由错误处理链统一生成最终响应。

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::application::ManagerError;
use crate::domain::ResourceKey;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API 错误
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// 请求格式错误或载荷不完整
    #[error("{0}")]
    Validation(String),

    /// 主键不存在
    #[error("{resource} not found")]
    NotFound {
        resource: &'static str,
        key: Option<ResourceKey>,
    },

    /// 路由存在但不支持该方法
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    /// 唯一约束冲突
    #[error("{0}")]
    Conflict(String),

    /// 存储层错误
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// 未分类错误
    #[error("unhandled failure: {0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, key: Option<ResourceKey>) -> Self {
        Self::NotFound { resource, key }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Persistence(_) | ApiError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 对外可见的错误信息
    ///
    /// 存储错误与未分类错误只返回通用信息，不暴露连接串或内部细节
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Persistence(_) | ApiError::Unhandled(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// 按错误分类渲染 JSON 响应
    pub fn render(&self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}

/// 被转发到错误处理链的错误
#[derive(Debug, Clone)]
pub struct ForwardedError(Arc<ApiError>);

impl ForwardedError {
    pub fn error(&self) -> &ApiError {
        &self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 未经过错误处理链时占位响应本身也是完整的
        let mut response = self.render();
        response
            .extensions_mut()
            .insert(ForwardedError(Arc::new(self)));
        response
    }
}

impl From<ManagerError> for ApiError {
    fn from(e: ManagerError) -> Self {
        match e {
            ManagerError::Validation(msg) => ApiError::Validation(msg),
            ManagerError::NotFound { resource, key } => ApiError::not_found(resource, Some(key)),
            ManagerError::Conflict(msg) => ApiError::Conflict(msg),
            ManagerError::Persistence(msg) => ApiError::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("user", Some(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::MethodNotAllowed("PUT".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Unhandled("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::Persistence("unable to open sqlite:/secret/path.db".into());
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(
            ApiError::not_found("team", None).public_message(),
            "team not found"
        );
    }

    #[test]
    fn test_into_response_carries_forwarded_error() {
        let response = ApiError::Conflict("username taken".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let forwarded = response.extensions().get::<ForwardedError>().unwrap();
        assert!(matches!(forwarded.error(), ApiError::Conflict(_)));
    }

    #[test]
    fn test_from_manager_error() {
        let err: ApiError = ManagerError::not_found("user", 3).into();
        assert!(matches!(
            err,
            ApiError::NotFound {
                resource: "user",
                key: Some(3)
            }
        ));
    }
}
