//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod match_log_manager;
mod seed;
mod team_manager;
mod user_manager;

pub use database::*;
pub use match_log_manager::*;
pub use seed::*;
pub use team_manager::*;
pub use user_manager::*;
