//! 应用层
//!
//! 包含：
//! - ports: Resource Manager 端口
//! - error: Manager 错误定义

pub mod error;
pub mod ports;

pub use error::ManagerError;
pub use ports::ResourceManager;
