//! Infrastructure Layer - 基础设施层
//!
//! 提供端口的具体实现与 HTTP 接入

pub mod http;
pub mod persistence;

pub use http::{default_app, App};
