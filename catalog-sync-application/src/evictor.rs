//! 缓存清理（CacheEvictor）
//!
//! 远端修改或删除目录对象后，清理本地资源池中由该对象派生的缓存。
//! 只处理远端事件：本地变更由变更点自行维护缓存。
//!
use async_trait::async_trait;
use catalog_sync_domain::catalog::{CatalogLookup, ResourcePool};
use catalog_sync_domain::domain_event::{EventKind, InfoEvent};
use catalog_sync_domain::entity::{EntityCategory, EntityType};
use catalog_sync_domain::error::DomainResult;
use catalog_sync_domain::eventing::{EventListener, HandledEventKind};
use std::sync::Arc;
use tracing::debug;

/// 分发顺序：在远端事件被应用（对象被替换或删除）之前清理
pub const EVICTOR_ORDER: i32 = -100;

pub struct CacheEvictor {
    lookup: Arc<dyn CatalogLookup>,
    pool: Arc<dyn ResourcePool>,
}

impl CacheEvictor {
    pub fn new(lookup: Arc<dyn CatalogLookup>, pool: Arc<dyn ResourcePool>) -> Self {
        Self { lookup, pool }
    }

    /// 返回是否清理了缓存
    pub fn evict(&self, event: &InfoEvent) -> bool {
        if event.is_local() {
            return false;
        }

        let target = event.target();
        let Some(object) = self.lookup.find(&target) else {
            debug!(
                event_id = event.event_id(),
                object_type = %target.entity_type(),
                object_id = target.id(),
                "evictor: object not found locally, nothing to clear"
            );
            return false;
        };

        if target.is_a(EntityCategory::Store) {
            self.pool.clear_store(object.as_ref());
        } else if target.is_a(EntityCategory::Resource) {
            self.pool.clear_resource(object.as_ref());
        } else if target.entity_type() == EntityType::Style {
            self.pool.clear_style(object.as_ref());
        } else {
            return false;
        }
        true
    }
}

#[async_trait]
impl EventListener for CacheEvictor {
    fn listener_name(&self) -> &str {
        "cache-evictor"
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        HandledEventKind::Many(vec![EventKind::PostModify, EventKind::Removed])
    }

    fn order(&self) -> i32 {
        EVICTOR_ORDER
    }

    async fn handle(&self, event: &InfoEvent) -> DomainResult<()> {
        self.evict(event);
        Ok(())
    }
}
