//! Application Composer
//!
//! 构造阶段严格按顺序进行，由类型状态保证：
//! 1. 注册前置中间件（以及端口、静态资源等基础配置）
//! 2. 注册资源控制器
//! 3. 注册错误处理单元
//!
//! `build()` 之后应用不可变，`start()` 绑定端口并开始服务。
//! 路径末尾的 `/` 在路由前去掉，`/api/users/` 与 `/api/users` 等价。

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::Request, middleware, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::SecretString;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::error::ApiError;
use super::middleware::{
    dispatch, panic_to_error, AppSecret, ErrorHandler, MiddlewareChain, RequestMiddleware,
};

/// 未指定端口时使用的默认端口
pub const DEFAULT_PORT: u16 = 9000;

const DEFAULT_HOST: &str = "0.0.0.0";

/// 构造阶段错误，出现即视为启动失败
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("duplicate path prefix: {0}")]
    DuplicatePrefix(String),

    #[error("path prefix {prefix} overlaps with {existing}")]
    OverlappingPrefix { prefix: String, existing: String },

    #[error("invalid path prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        prefix: String,
        reason: &'static str,
    },
}

/// 一个挂载单元：路径前缀 + 路由
pub struct Registration {
    path_prefix: String,
    router: Router,
}

impl Registration {
    pub fn new(path_prefix: impl Into<String>, router: Router) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            router,
        }
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }
}

/// 静态资源配置
///
/// 目录中存在的文件优先于 API 路由
#[derive(Debug, Clone)]
pub struct StaticFiles {
    dir: PathBuf,
    documents: Vec<(String, PathBuf)>,
}

impl StaticFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            documents: Vec::new(),
        }
    }

    /// 固定文档路由，如 `/user` -> `user.html`
    pub fn document(mut self, route: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        let file = self.dir.join(file.into());
        self.documents.push((route.into(), file));
        self
    }

    fn mount(self, api: Router) -> Router {
        let mut router = Router::new();
        for (route, file) in self.documents {
            router = router.route_service(&route, ServeFile::new(file));
        }
        let assets = ServeDir::new(self.dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(api);
        router.fallback_service(assets)
    }
}

/// 最终对外提供服务的路由
pub type AppService = NormalizePath<Router>;

/// 启动完成后的回调，参数为实际监听地址
pub type StartObserver = Box<dyn FnOnce(SocketAddr) + Send>;

/// 构造阶段标记
pub mod phase {
    /// 注册前置中间件
    pub struct Middleware;
    /// 注册控制器
    pub struct Controllers;
    /// 注册错误处理单元
    pub struct ErrorHandlers;
}

/// 应用构造器
pub struct AppBuilder<P> {
    secret: AppSecret,
    host: String,
    port: u16,
    static_files: Option<StaticFiles>,
    on_start: Option<StartObserver>,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
    registrations: Vec<Registration>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    _phase: PhantomData<P>,
}

impl<P> AppBuilder<P> {
    fn into_phase<Q>(self) -> AppBuilder<Q> {
        AppBuilder {
            secret: self.secret,
            host: self.host,
            port: self.port,
            static_files: self.static_files,
            on_start: self.on_start,
            middleware: self.middleware,
            registrations: self.registrations,
            error_handlers: self.error_handlers,
            _phase: PhantomData,
        }
    }
}

impl AppBuilder<phase::Middleware> {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret: AppSecret::new(secret),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_files: None,
            on_start: None,
            middleware: Vec::new(),
            registrations: Vec::new(),
            error_handlers: Vec::new(),
            _phase: PhantomData,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn static_files(mut self, static_files: StaticFiles) -> Self {
        self.static_files = Some(static_files);
        self
    }

    pub fn on_start(mut self, observer: impl FnOnce(SocketAddr) + Send + 'static) -> Self {
        self.on_start = Some(Box::new(observer));
        self
    }

    pub fn middleware(self, unit: impl RequestMiddleware) -> Self {
        self.shared_middleware(Arc::new(unit))
    }

    pub fn shared_middleware(mut self, unit: Arc<dyn RequestMiddleware>) -> Self {
        self.middleware.push(unit);
        self
    }

    /// 结束中间件注册，进入控制器注册阶段
    pub fn controllers(self) -> AppBuilder<phase::Controllers> {
        self.into_phase()
    }
}

impl AppBuilder<phase::Controllers> {
    /// 挂载控制器，路径前缀必须唯一
    pub fn controller(
        mut self,
        registration: impl Into<Registration>,
    ) -> Result<Self, ComposeError> {
        let mut registration = registration.into();
        let prefix = normalize_prefix(&registration.path_prefix)?;

        for existing in &self.registrations {
            if existing.path_prefix == prefix {
                return Err(ComposeError::DuplicatePrefix(prefix));
            }
            if is_nested(&existing.path_prefix, &prefix) || is_nested(&prefix, &existing.path_prefix)
            {
                return Err(ComposeError::OverlappingPrefix {
                    prefix,
                    existing: existing.path_prefix.clone(),
                });
            }
        }

        tracing::debug!(prefix = %prefix, "Controller registered");
        registration.path_prefix = prefix;
        self.registrations.push(registration);
        Ok(self)
    }

    /// 结束控制器注册，进入错误处理单元注册阶段
    pub fn error_handlers(self) -> AppBuilder<phase::ErrorHandlers> {
        self.into_phase()
    }
}

impl AppBuilder<phase::ErrorHandlers> {
    pub fn error_handler(self, handler: impl ErrorHandler) -> Self {
        self.shared_error_handler(Arc::new(handler))
    }

    pub fn shared_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handlers.push(handler);
        self
    }

    /// 组装最终的应用
    pub fn build(self) -> App {
        let prefixes: Vec<String> = self
            .registrations
            .iter()
            .map(|r| r.path_prefix.clone())
            .collect();

        let chain = Arc::new(MiddlewareChain::new(
            self.secret,
            self.middleware,
            self.error_handlers,
        ));

        let mut api = Router::new();
        for registration in self.registrations {
            api = api.nest(&registration.path_prefix, registration.router);
        }
        let api = api
            .fallback(route_not_found)
            .layer(CatchPanicLayer::custom(panic_to_error))
            .layer(middleware::from_fn_with_state(chain, dispatch));

        let router = match self.static_files {
            Some(static_files) => static_files.mount(api),
            None => api,
        };

        // CORS 配置 - 允许所有来源的跨域请求
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600));

        let router = router.layer(TraceLayer::new_for_http()).layer(cors);

        App {
            service: NormalizePath::trim_trailing_slash(router),
            host: self.host,
            port: self.port,
            prefixes,
            on_start: self.on_start,
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("route", None)
}

/// 去掉末尾的 `/` 并校验前缀
fn normalize_prefix(raw: &str) -> Result<String, ComposeError> {
    let invalid = |reason| ComposeError::InvalidPrefix {
        prefix: raw.to_string(),
        reason,
    };

    let prefix = raw.trim_end_matches('/');
    if prefix.is_empty() {
        return Err(invalid("controllers cannot be mounted at the root"));
    }
    if !prefix.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if prefix.contains(|c| c == ':' || c == '*' || c == '{' || c == '}') {
        return Err(invalid("must not contain path parameters"));
    }
    if prefix.contains("//") {
        return Err(invalid("must not contain empty segments"));
    }
    Ok(prefix.to_string())
}

/// `inner` 是否挂在 `outer` 之下
fn is_nested(outer: &str, inner: &str) -> bool {
    inner
        .strip_prefix(outer)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

/// 一次性构造所需的全部配置
pub struct AppSetup {
    pub secret: SecretString,
    pub controllers: Vec<Registration>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub middleware: Vec<Arc<dyn RequestMiddleware>>,
    pub error_handlers: Vec<Arc<dyn ErrorHandler>>,
    pub static_files: Option<StaticFiles>,
}

impl AppSetup {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            controllers: Vec::new(),
            host: None,
            port: None,
            middleware: Vec::new(),
            error_handlers: Vec::new(),
            static_files: None,
        }
    }
}

/// HTTP 应用
pub struct App {
    service: AppService,
    host: String,
    port: u16,
    prefixes: Vec<String>,
    on_start: Option<StartObserver>,
}

impl App {
    pub fn builder(secret: SecretString) -> AppBuilder<phase::Middleware> {
        AppBuilder::new(secret)
    }

    /// 按固定顺序完成全部注册阶段
    pub fn construct(setup: AppSetup) -> Result<Self, ComposeError> {
        let mut builder = App::builder(setup.secret);
        if let Some(host) = setup.host {
            builder = builder.host(host);
        }
        if let Some(port) = setup.port {
            builder = builder.port(port);
        }
        if let Some(static_files) = setup.static_files {
            builder = builder.static_files(static_files);
        }
        for unit in setup.middleware {
            builder = builder.shared_middleware(unit);
        }

        let mut builder = builder.controllers();
        for registration in setup.controllers {
            builder = builder.controller(registration)?;
        }

        let mut builder = builder.error_handlers();
        for handler in setup.error_handlers {
            builder = builder.shared_error_handler(handler);
        }

        Ok(builder.build())
    }

    /// 组装好的路由（测试或嵌入其他服务时使用）
    pub fn router(&self) -> AppService {
        self.service.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 已挂载的路径前缀，按注册顺序
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// 启动服务器
    pub async fn start(self) -> Result<(), std::io::Error> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// 启动服务器（带优雅关闭）
    pub async fn start_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        let observer: StartObserver = match self.on_start {
            Some(observer) => observer,
            None => Box::new(log_listening),
        };
        observer(local_addr);

        let make_service = axum::ServiceExt::<Request>::into_make_service(self.service);
        axum::serve(listener, make_service)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

fn log_listening(addr: SocketAddr) {
    info!("App listening on {}", addr);
}
