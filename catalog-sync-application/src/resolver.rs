//! 引用解析（ReferenceResolver）
//!
//! 遍历事件载荷中的所有引用并按 `(id, type)` 在本地目录中查找：
//! 找到的替换为已解析对象，找不到的保留为未解析占位并计入缺失集合。
//! 集合型属性逐个元素解析，单个元素缺失不影响同一属性中的其他元素。
//! 对已完全解析的事件再次解析得到空集合。
//!
use catalog_sync_domain::catalog::CatalogLookup;
use catalog_sync_domain::domain_event::{EventPayload, InfoEvent};
use catalog_sync_domain::entity::{EntityRef, Reference};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReferenceResolver {
    lookup: Arc<dyn CatalogLookup>,
}

impl ReferenceResolver {
    pub fn new(lookup: Arc<dyn CatalogLookup>) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, event: &InfoEvent) -> (InfoEvent, BTreeSet<EntityRef>) {
        let mut resolved = event.clone();
        let missing = self.resolve_in_place(&mut resolved);
        (resolved, missing)
    }

    /// 原地解析，返回仍缺失的引用
    ///
    /// 增量修改（不带整体替换对象的 PostModify）要求目标本身存在，
    /// 目标缺失时同样计入缺失集合。
    pub fn resolve_in_place(&self, event: &mut InfoEvent) -> BTreeSet<EntityRef> {
        let mut missing = BTreeSet::new();

        event.for_each_ref_mut(&mut |reference| {
            let Reference::Unresolved(entity_ref) = reference else {
                return;
            };
            match self.lookup.find(entity_ref) {
                Some(found) => *reference = Reference::Resolved(found),
                None => {
                    missing.insert(entity_ref.clone());
                }
            }
        });

        if let EventPayload::PostModify {
            target,
            replacement: None,
            ..
        } = event.payload()
        {
            if self.lookup.find(target).is_none() {
                missing.insert(target.clone());
            }
        }

        missing
    }
}
