//! 内存资源池（InMemoryResourcePool）
//!
//! 以 `EntityRef` 为键记录已缓存的派生产物，清理时移除并按类别计数。
//! 用于测试与演示。
//!
use catalog_sync_domain::catalog::ResourcePool;
use catalog_sync_domain::entity::{CatalogInfo, EntityRef};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemoryResourcePool {
    cached: DashMap<EntityRef, ()>,
    stores_cleared: AtomicUsize,
    resources_cleared: AtomicUsize,
    styles_cleared: AtomicUsize,
}

impl InMemoryResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self, entity_ref: EntityRef) {
        self.cached.insert(entity_ref, ());
    }

    pub fn is_cached(&self, entity_ref: &EntityRef) -> bool {
        self.cached.contains_key(entity_ref)
    }

    pub fn stores_cleared(&self) -> usize {
        self.stores_cleared.load(Ordering::Relaxed)
    }

    pub fn resources_cleared(&self) -> usize {
        self.resources_cleared.load(Ordering::Relaxed)
    }

    pub fn styles_cleared(&self) -> usize {
        self.styles_cleared.load(Ordering::Relaxed)
    }

    fn clear(&self, info: &dyn CatalogInfo, counter: &AtomicUsize) {
        self.cached.remove(&info.entity_ref());
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl ResourcePool for InMemoryResourcePool {
    fn clear_store(&self, store: &dyn CatalogInfo) {
        self.clear(store, &self.stores_cleared);
    }

    fn clear_resource(&self, resource: &dyn CatalogInfo) {
        self.clear(resource, &self.resources_cleared);
    }

    fn clear_style(&self, style: &dyn CatalogInfo) {
        self.clear(style, &self.styles_cleared);
    }
}
