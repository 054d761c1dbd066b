//! Resource Controller
//!
//! 将 HTTP 动词 / 路径绑定到 Manager 操作，每种资源共用同一套 handler：
//!
//! - GET    /          getAll    200 + 投影数组
//! - GET    /:key      getById   200 + 投影，未找到直接返回 404
//! - POST   /          create    201 + 摘要投影
//! - PATCH  /:key      update    200 + 摘要投影
//! - DELETE /?id=      remove    200 空响应
//! - DELETE /:key      remove    200 空响应
//!
//! 其他方法返回 405。除单条 GET 的 404 外，所有失败都转发给错误处理链

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::error::{ApiError, ErrorResponse};
use super::server::Registration;
use crate::application::ResourceManager;
use crate::domain::{parse_key, Lookup, Payload, Resource, ResourceKey};

/// 资源控制器
pub struct ResourceController<M> {
    path: String,
    manager: Arc<M>,
}

impl<M: ResourceManager> ResourceController<M> {
    pub fn new(path: impl Into<String>, manager: Arc<M>) -> Self {
        Self {
            path: path.into(),
            manager,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 构建该资源的路由
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(list::<M>)
                    .post(create::<M>)
                    .delete(remove_by_query::<M>)
                    .fallback(method_not_allowed),
            )
            .route(
                "/:key",
                get(get_one::<M>)
                    .patch(update::<M>)
                    .delete(remove::<M>)
                    .fallback(method_not_allowed),
            )
            .with_state(self.manager.clone())
    }
}

impl<M: ResourceManager> From<ResourceController<M>> for Registration {
    fn from(controller: ResourceController<M>) -> Self {
        let router = controller.router();
        Registration::new(controller.path, router)
    }
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    id: Option<String>,
}

/// 解析请求体；JSON 格式错误与字段不匹配都视为验证错误
fn decode_payload<T: Payload>(body: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    serde_json::from_value(value).map_err(|e| ApiError::Validation(e.to_string()))
}

/// 解析路径主键，无法解析的主键不对应任何实体
fn require_key<R: Resource>(raw: &str) -> Result<ResourceKey, ApiError> {
    parse_key(raw).ok_or_else(|| ApiError::not_found(R::KIND, None))
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

async fn list<M: ResourceManager>(
    State(manager): State<Arc<M>>,
) -> Result<Response, ApiError> {
    let entities = manager.get_all().await?;
    let views: Vec<_> = entities.iter().map(|entity| entity.view()).collect();
    Ok(Json(views).into_response())
}

async fn get_one<M: ResourceManager>(
    State(manager): State<Arc<M>>,
    Path(raw_key): Path<String>,
) -> Result<Response, ApiError> {
    let lookup = match parse_key(&raw_key) {
        Some(key) => manager.get_by_id(key).await?,
        None => Lookup::NotFound,
    };

    match lookup {
        Lookup::Found(entity) => Ok(Json(entity.view()).into_response()),
        Lookup::NotFound => {
            let kind = <M::Entity as Resource>::KIND;
            Ok((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("{} not found", kind))),
            )
                .into_response())
        }
    }
}

async fn create<M: ResourceManager>(
    State(manager): State<Arc<M>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload: M::Create = decode_payload(body)?;
    let entity = manager.create(payload).await?;
    Ok((StatusCode::CREATED, Json(entity.summary())).into_response())
}

async fn update<M: ResourceManager>(
    State(manager): State<Arc<M>>,
    Path(raw_key): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let key = require_key::<M::Entity>(&raw_key)?;
    let patch: M::Patch = decode_payload(body)?;
    let entity = manager.update(key, patch).await?;
    Ok(Json(entity.summary()).into_response())
}

async fn remove<M: ResourceManager>(
    State(manager): State<Arc<M>>,
    Path(raw_key): Path<String>,
) -> Result<Response, ApiError> {
    let key = require_key::<M::Entity>(&raw_key)?;
    manager.remove(key).await?;
    Ok(StatusCode::OK.into_response())
}

async fn remove_by_query<M: ResourceManager>(
    State(manager): State<Arc<M>>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, ApiError> {
    let raw_key = query
        .id
        .ok_or_else(|| ApiError::Validation("missing id".to_string()))?;
    let key = require_key::<M::Entity>(&raw_key)?;
    manager.remove(key).await?;
    Ok(StatusCode::OK.into_response())
}
