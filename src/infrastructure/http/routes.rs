//! HTTP Routes
//!
//! 默认应用的组装
//!
//! API Endpoints:
//! - /api/users        用户
//! - /api/match-logs   对局记录
//! - /api/teams        队伍
//!
//! 页面:
//! - /                 index.html
//! - /user             user.html
//! - /match-four       match-four.html
//! - /match-three      match-three.html

use std::sync::Arc;

use super::controller::ResourceController;
use super::middleware::{ErrorLogger, JsonErrorResponder, RequestLogger};
use super::server::{App, AppSetup, ComposeError, StaticFiles};
use crate::config::AppConfig;
use crate::infrastructure::persistence::sqlite::{
    DbPool, SqliteMatchLogManager, SqliteTeamManager, SqliteUserManager,
};

/// 创建默认应用
pub fn default_app(config: &AppConfig, pool: DbPool) -> Result<App, ComposeError> {
    let mut setup = AppSetup::new(config.app.secret.clone());
    setup.host = Some(config.server.host.clone());
    setup.port = Some(config.server.port);

    if config.server.static_files.enabled {
        setup.static_files = Some(
            StaticFiles::new(&config.server.static_files.dir)
                .document("/user", "user.html")
                .document("/match-four", "match-four.html")
                .document("/match-three", "match-three.html"),
        );
    }

    setup.middleware = vec![Arc::new(RequestLogger)];

    setup.controllers = vec![
        ResourceController::new("/api/users", Arc::new(SqliteUserManager::new(pool.clone())))
            .into(),
        ResourceController::new(
            "/api/match-logs",
            Arc::new(SqliteMatchLogManager::new(pool.clone())),
        )
        .into(),
        ResourceController::new("/api/teams", Arc::new(SqliteTeamManager::new(pool))).into(),
    ];

    setup.error_handlers = vec![Arc::new(ErrorLogger), Arc::new(JsonErrorResponder)];

    App::construct(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    async fn app() -> App {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let mut config = AppConfig::default();
        config.server.static_files.enabled = false;
        default_app(&config, pool).unwrap()
    }

    #[tokio::test]
    async fn test_default_app_mounts_all_resources() {
        let app = app().await;
        assert_eq!(
            app.prefixes(),
            ["/api/users", "/api/match-logs", "/api/teams"]
        );
    }

    #[tokio::test]
    async fn test_match_log_projection() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/match-logs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"mode": "four", "team_id": 1, "score": 25000, "memo": "east"}).to_string(),
            ))
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(created["mode"], "four");
        assert_eq!(created["score"], 25000);
        assert!(created.get("memo").is_none());

        let request = Request::builder()
            .uri(format!("/api/match-logs/{}", created["id"]))
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let fetched: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched["memo"], "east");
        assert_eq!(fetched["team_id"], 1);
    }

    #[tokio::test]
    async fn test_invalid_mode_is_bad_request() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/match-logs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"mode": "five", "team_id": 1, "score": 0}).to_string(),
            ))
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_scenario_on_collection_paths() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/users/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"username": "alice", "email": "a@x.com", "password": "secret"})
                    .to_string(),
            ))
            .unwrap();

        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: Value = serde_json::from_slice(&body).unwrap();
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created, json!({"id": id, "username": "alice"}));

        let request = Request::builder()
            .uri("/api/users/")
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let all: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            all,
            json!([{"id": id, "username": "alice", "email": "a@x.com"}])
        );
    }

    #[tokio::test]
    async fn test_delete_team_by_query_on_collection_path() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/teams/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "red"}).to_string()))
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: Value = serde_json::from_slice(&body).unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/teams/?id={}", created["id"]))
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let request = Request::builder()
            .uri(format!("/api/teams/{}", created["id"]))
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
