//! Resource - 资源实体的公共契约
//!
//! 每种资源（user、team、match log）都必须提供：
//! - 稳定的主键
//! - 显式的字段投影（响应中只出现白名单字段）

use serde::de::DeserializeOwned;
use serde::Serialize;

/// 资源主键，由存储层生成
pub type ResourceKey = i64;

/// 资源实体
///
/// 不变量:
/// - `view()` / `summary()` 是唯一的对外投影，原始实体永远不直接序列化
pub trait Resource: Send + Sync + 'static {
    /// 资源名称，用于错误信息（如 "user not found"）
    const KIND: &'static str;

    /// 查询（GET）时返回的投影
    type View: Serialize + Send;

    /// 创建 / 更新（POST / PATCH）时返回的投影
    type Summary: Serialize + Send;

    fn key(&self) -> ResourceKey;

    fn view(&self) -> Self::View;

    fn summary(&self) -> Self::Summary;
}

/// 请求载荷（创建或部分更新）
pub trait Payload: DeserializeOwned + Send + 'static {
    /// 校验载荷，返回面向调用方的错误描述
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// 按主键查找的结果
///
/// 未找到是正常结果，不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(entity) => Lookup::Found(entity),
            None => Lookup::NotFound,
        }
    }
}

/// 解析路径中的主键
///
/// 非整数或非正数的主键不可能对应任何实体，返回 None
pub fn parse_key(raw: &str) -> Option<ResourceKey> {
    raw.trim().parse::<ResourceKey>().ok().filter(|key| *key > 0)
}
