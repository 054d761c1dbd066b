//! Matchboard - 对局记录服务
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - User / Team / MatchLog 实体、创建与修改载荷
//! - Resource: 资源的投影（view / summary）
//!
//! 应用层 (application/):
//! - Ports: ResourceManager
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 通用资源控制器、中间件链、应用组装
//! - Persistence: SQLite 存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
pub use infrastructure::http::{default_app, App, AppBuilder};
