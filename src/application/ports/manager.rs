//! Resource Manager Port - 出站端口
//!
//! 每种资源一个数据访问单元，具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;

use crate::application::error::ManagerError;
use crate::domain::{Lookup, Payload, Resource, ResourceKey};

/// Resource Manager Port
///
/// 所有读操作都直接访问存储，不存在内存缓存
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    type Entity: Resource;
    type Create: Payload;
    type Patch: Payload;

    /// 创建实体
    ///
    /// 载荷校验失败返回 `ManagerError::Validation`
    async fn create(&self, payload: Self::Create) -> Result<Self::Entity, ManagerError>;

    /// 根据主键查找，未找到返回 `Lookup::NotFound` 而不是错误
    async fn get_by_id(&self, key: ResourceKey) -> Result<Lookup<Self::Entity>, ManagerError>;

    /// 获取全部实体，按存储的自然顺序
    async fn get_all(&self) -> Result<Vec<Self::Entity>, ManagerError>;

    /// 部分更新，只修改载荷中出现的字段
    async fn update(
        &self,
        key: ResourceKey,
        patch: Self::Patch,
    ) -> Result<Self::Entity, ManagerError>;

    /// 删除实体，主键不存在时返回 `ManagerError::NotFound`（重复删除同样失败）
    async fn remove(&self, key: ResourceKey) -> Result<(), ManagerError>;
}
