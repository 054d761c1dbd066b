//! Domain Layer - 领域层
//!
//! 三种资源:
//! - User: 用户
//! - Team: 队伍
//! - MatchLog: 对局记录

pub mod match_log;
pub mod resource;
pub mod team;
pub mod user;

pub use match_log::{MatchLog, MatchLogPatch, MatchMode, NewMatchLog};
pub use resource::{parse_key, Lookup, Payload, Resource, ResourceKey};
pub use team::{NewTeam, Team, TeamPatch};
pub use user::{NewUser, User, UserPatch};
