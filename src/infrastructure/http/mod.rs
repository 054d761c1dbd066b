//! HTTP Layer - 资源控制器组合
//!
//! - controller: 通用 CRUD 控制器
//! - middleware: 前置中间件与错误处理链
//! - server: 应用构造与启动
//! - routes: 默认应用

pub mod controller;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use controller::ResourceController;
pub use error::{ApiError, ErrorResponse};
pub use middleware::{
    AppSecret, ErrorContext, ErrorHandler, ErrorLogger, Flow, JsonErrorResponder,
    RequestLogger, RequestMiddleware,
};
pub use routes::default_app;
pub use server::{App, AppBuilder, AppService, AppSetup, ComposeError, Registration, StaticFiles};
