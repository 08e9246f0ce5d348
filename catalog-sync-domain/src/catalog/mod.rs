//! 外部协作者接口（catalog）
//!
//! 目录/配置对象模型与缓存本身不在本库范围内，这里只定义同步所需的接口：
//! - `CatalogLookup`：按 `(id, type)` 查找本地对象；
//! - `RemoteEventApplier`：把远端事件应用到本地目录；
//! - `ResourcePool`：按类型清理本地缓存的派生产物。
//!
//! `InMemoryCatalog` 同时实现前两者，用于测试与演示。
//!
use crate::domain_event::InfoEvent;
use crate::entity::{CatalogInfo, EntityRef, EntityType};
use crate::error::DomainResult;
use async_trait::async_trait;
use std::sync::Arc;

mod inmemory;

pub use inmemory::InMemoryCatalog;

/// 本地目录查找服务
pub trait CatalogLookup: Send + Sync {
    fn find_by_id_and_type(&self, id: &str, entity_type: EntityType)
    -> Option<Arc<dyn CatalogInfo>>;

    fn find(&self, entity_ref: &EntityRef) -> Option<Arc<dyn CatalogInfo>> {
        self.find_by_id_and_type(entity_ref.id(), entity_ref.entity_type())
    }
}

/// 远端事件应用器：新增、修改或删除本地目录中的对象
#[async_trait]
pub trait RemoteEventApplier: Send + Sync {
    async fn apply(&self, event: &InfoEvent) -> DomainResult<()>;
}

/// 资源池：缓存着由目录对象派生的产物（数据源连接、要素类型、样式等）
pub trait ResourcePool: Send + Sync {
    fn clear_store(&self, store: &dyn CatalogInfo);

    fn clear_resource(&self, resource: &dyn CatalogInfo);

    fn clear_style(&self, style: &dyn CatalogInfo);
}
