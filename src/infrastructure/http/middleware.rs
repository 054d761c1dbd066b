//! HTTP Middleware
//!
//! 中间件链：
//! - 前置单元（`RequestMiddleware`）按注册顺序执行，可放行或直接响应
//! - 错误单元（`ErrorHandler`）仅在失败时执行，按注册顺序，第一个给出响应的单元生效
//! - 所有单元都未响应时，由兜底处理返回通用 500
//!
//! 单元内部的 panic 视为未分类错误，请求总能得到响应

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use secrecy::{ExposeSecret, SecretString};

use super::error::{ApiError, ForwardedError};

/// 应用密钥，注入到每个请求的扩展中
#[derive(Clone, Debug)]
pub struct AppSecret(SecretString);

impl AppSecret {
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// 前置单元的执行结果
pub enum Flow {
    /// 交给下一个单元
    Next(Request),
    /// 短路，直接返回响应
    Respond(Response),
}

/// 前置中间件单元
///
/// 返回 `Err` 时请求进入错误处理链
#[async_trait]
pub trait RequestMiddleware: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Result<Flow, ApiError>;
}

/// 失败请求的上下文
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub method: Method,
    pub uri: Uri,
}

/// 错误处理单元
///
/// 返回 `None` 表示交给下一个单元
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: &ApiError, context: &ErrorContext) -> Option<Response>;
}

/// 中间件链，构造完成后不可变
pub struct MiddlewareChain {
    secret: AppSecret,
    pre_request: Vec<Arc<dyn RequestMiddleware>>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl MiddlewareChain {
    pub fn new(
        secret: AppSecret,
        pre_request: Vec<Arc<dyn RequestMiddleware>>,
        error_handlers: Vec<Arc<dyn ErrorHandler>>,
    ) -> Self {
        Self {
            secret,
            pre_request,
            error_handlers,
        }
    }

    async fn run_pre_request(&self, mut request: Request) -> Result<Flow, ApiError> {
        for unit in &self.pre_request {
            match unit.handle(request).await? {
                Flow::Next(next) => request = next,
                respond @ Flow::Respond(_) => return Ok(respond),
            }
        }
        Ok(Flow::Next(request))
    }

    /// 依次执行错误单元，第一个响应生效
    ///
    /// panic 的单元按未响应处理
    pub fn resolve(&self, error: &ApiError, context: &ErrorContext) -> Response {
        for handler in &self.error_handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(error, context))) {
                Ok(Some(response)) => return response,
                Ok(None) => {}
                Err(payload) => {
                    tracing::error!(
                        method = %context.method,
                        uri = %context.uri,
                        panic = %panic_message(payload.as_ref()),
                        "Error handler panicked"
                    );
                }
            }
        }

        tracing::error!(
            method = %context.method,
            uri = %context.uri,
            error = %error,
            "No error handler produced a response"
        );
        ApiError::Unhandled(error.to_string()).render()
    }
}

/// 中间件链入口
pub async fn dispatch(
    State(chain): State<Arc<MiddlewareChain>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = ErrorContext {
        method: request.method().clone(),
        uri: request.uri().clone(),
    };
    request.extensions_mut().insert(chain.secret.clone());

    let pre_request = AssertUnwindSafe(chain.run_pre_request(request))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(ApiError::Unhandled(panic_message(payload.as_ref()))));

    let response = match pre_request {
        Ok(Flow::Next(request)) => next.run(request).await,
        Ok(Flow::Respond(response)) => response,
        Err(error) => return chain.resolve(&error, &context),
    };

    match response.extensions().get::<ForwardedError>().cloned() {
        Some(forwarded) => chain.resolve(forwarded.error(), &context),
        None => response,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// 将 handler 中的 panic 转换为未分类错误，交给错误处理链
pub fn panic_to_error(payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Unhandled(panic_message(payload.as_ref())).into_response()
}

// ============================================================================
// 内置单元
// ============================================================================

/// 请求日志
pub struct RequestLogger;

#[async_trait]
impl RequestMiddleware for RequestLogger {
    async fn handle(&self, request: Request) -> Result<Flow, ApiError> {
        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            "Incoming request"
        );
        Ok(Flow::Next(request))
    }
}

/// 错误日志，只记录不响应
pub struct ErrorLogger;

impl ErrorHandler for ErrorLogger {
    fn handle(&self, error: &ApiError, context: &ErrorContext) -> Option<Response> {
        let status = error.status();
        if status.is_server_error() {
            tracing::error!(
                method = %context.method,
                uri = %context.uri,
                status = status.as_u16(),
                error = %error,
                "Request failed"
            );
        } else {
            tracing::warn!(
                method = %context.method,
                uri = %context.uri,
                status = status.as_u16(),
                error = %error,
                "Request rejected"
            );
        }
        None
    }
}

/// 按错误分类生成 JSON 响应
pub struct JsonErrorResponder;

impl ErrorHandler for JsonErrorResponder {
    fn handle(&self, error: &ApiError, _context: &ErrorContext) -> Option<Response> {
        Some(error.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    struct Maintenance;

    #[async_trait]
    impl RequestMiddleware for Maintenance {
        async fn handle(&self, request: Request) -> Result<Flow, ApiError> {
            if request.uri().path() == "/closed" {
                return Ok(Flow::Respond(StatusCode::SERVICE_UNAVAILABLE.into_response()));
            }
            Ok(Flow::Next(request))
        }
    }

    struct RejectAll;

    #[async_trait]
    impl RequestMiddleware for RejectAll {
        async fn handle(&self, _request: Request) -> Result<Flow, ApiError> {
            Err(ApiError::Validation("rejected".to_string()))
        }
    }

    struct Exploding;

    #[async_trait]
    impl RequestMiddleware for Exploding {
        async fn handle(&self, _request: Request) -> Result<Flow, ApiError> {
            panic!("middleware state corrupted at /etc/app.conf")
        }
    }

    struct ExplodingHandler;

    impl ErrorHandler for ExplodingHandler {
        fn handle(&self, _error: &ApiError, _context: &ErrorContext) -> Option<Response> {
            panic!("error handler failed")
        }
    }

    struct Teapot;

    impl ErrorHandler for Teapot {
        fn handle(&self, _error: &ApiError, _context: &ErrorContext) -> Option<Response> {
            Some(StatusCode::IM_A_TEAPOT.into_response())
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl ErrorHandler for Counting {
        fn handle(&self, _error: &ApiError, _context: &ErrorContext) -> Option<Response> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    async fn ok_handler() -> &'static str {
        "OK"
    }

    async fn secret_handler(Extension(secret): Extension<AppSecret>) -> String {
        secret.expose().to_string()
    }

    async fn failing_handler() -> Result<&'static str, ApiError> {
        Err(ApiError::Persistence("disk I/O error at /var/db".to_string()))
    }

    fn router(
        pre_request: Vec<Arc<dyn RequestMiddleware>>,
        error_handlers: Vec<Arc<dyn ErrorHandler>>,
    ) -> Router {
        let chain = Arc::new(MiddlewareChain::new(
            AppSecret::new(SecretString::from("s3cret".to_string())),
            pre_request,
            error_handlers,
        ));
        Router::new()
            .route("/ok", get(ok_handler))
            .route("/closed", get(ok_handler))
            .route("/secret", get(secret_handler))
            .route("/fail", get(failing_handler))
            .layer(axum::middleware::from_fn_with_state(chain, dispatch))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, String) {
        let request = HttpRequest::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_pass_through() {
        let app = router(vec![Arc::new(RequestLogger)], vec![]);
        assert_eq!(call(app, "/ok").await, (StatusCode::OK, "OK".to_string()));
    }

    #[tokio::test]
    async fn test_pre_request_short_circuit() {
        let app = router(vec![Arc::new(Maintenance)], vec![]);
        let (status, _) = call(app, "/closed").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_secret_is_visible_to_handlers() {
        let app = router(vec![], vec![]);
        assert_eq!(call(app, "/secret").await.1, "s3cret");
    }

    #[tokio::test]
    async fn test_first_responder_wins() {
        let counter = Counting::default();
        let app = router(
            vec![],
            vec![
                Arc::new(counter.clone()),
                Arc::new(Teapot),
                Arc::new(JsonErrorResponder),
                Arc::new(counter.clone()),
            ],
        );

        let (status, _) = call(app, "/fail").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_handlers_not_run_on_success() {
        let counter = Counting::default();
        let app = router(vec![], vec![Arc::new(counter.clone())]);

        call(app, "/ok").await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_hides_details() {
        let app = router(vec![], vec![Arc::new(ErrorLogger)]);
        let (status, body) = call(app, "/fail").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("/var/db"));
        assert!(body.contains("internal server error"));
    }

    #[tokio::test]
    async fn test_pre_request_failure_enters_error_chain() {
        let app = router(
            vec![Arc::new(RejectAll)],
            vec![Arc::new(JsonErrorResponder)],
        );
        let (status, body) = call(app, "/ok").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"rejected"}"#);
    }

    #[tokio::test]
    async fn test_pre_request_panic_still_answers() {
        let app = router(
            vec![Arc::new(Exploding)],
            vec![Arc::new(ErrorLogger), Arc::new(JsonErrorResponder)],
        );
        let (status, body) = call(app, "/ok").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"internal server error"}"#);
    }

    #[tokio::test]
    async fn test_panicking_error_handler_is_skipped() {
        let app = router(
            vec![],
            vec![Arc::new(ExplodingHandler), Arc::new(Teapot)],
        );
        let (status, _) = call(app, "/fail").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);

        let app = router(vec![], vec![Arc::new(ExplodingHandler)]);
        let (status, body) = call(app, "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("/var/db"));
    }
}
