//! 内存版目录（InMemoryCatalog）
//!
//! 以 `EntityRef` 为键保存 `InfoSnapshot`，实现查找与远端事件应用。
//! 典型用途：测试环境、示例与本地开发。

use super::{CatalogLookup, RemoteEventApplier};
use crate::domain_event::{EventPayload, InfoEvent, PropertyDiff};
use crate::entity::{CatalogInfo, EntityRef, EntityType, InfoSnapshot};
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct InMemoryCatalog {
    objects: RwLock<HashMap<EntityRef, Arc<InfoSnapshot>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增或整体替换对象
    pub fn add(&self, object: InfoSnapshot) -> Arc<InfoSnapshot> {
        let object = Arc::new(object);
        self.objects
            .write()
            .insert(object.entity_ref(), object.clone());
        object
    }

    pub fn get(&self, entity_ref: &EntityRef) -> Option<Arc<InfoSnapshot>> {
        self.objects.read().get(entity_ref).cloned()
    }

    pub fn contains(&self, entity_ref: &EntityRef) -> bool {
        self.objects.read().contains_key(entity_ref)
    }

    pub fn modify(
        &self,
        entity_ref: &EntityRef,
        diff: &PropertyDiff,
    ) -> DomainResult<Arc<InfoSnapshot>> {
        let mut objects = self.objects.write();
        let Some(current) = objects.get(entity_ref) else {
            return Err(DomainError::NotFound {
                reason: format!("{entity_ref} is not in the catalog"),
            });
        };

        let mut patched = InfoSnapshot::clone(current);
        patched.apply_diff(diff);
        let patched = Arc::new(patched);
        objects.insert(entity_ref.clone(), patched.clone());
        Ok(patched)
    }

    pub fn remove(&self, entity_ref: &EntityRef) -> Option<Arc<InfoSnapshot>> {
        self.objects.write().remove(entity_ref)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn find_by_id_and_type(
        &self,
        id: &str,
        entity_type: EntityType,
    ) -> Option<Arc<dyn CatalogInfo>> {
        self.get(&EntityRef::new(id, entity_type))
            .map(|object| object as Arc<dyn CatalogInfo>)
    }
}

#[async_trait]
impl RemoteEventApplier for InMemoryCatalog {
    async fn apply(&self, event: &InfoEvent) -> DomainResult<()> {
        match event.payload() {
            EventPayload::Added { object, .. } => {
                self.add(object.clone());
                Ok(())
            }
            EventPayload::PostModify {
                replacement: Some(object),
                ..
            } => {
                self.add(object.clone());
                Ok(())
            }
            EventPayload::PostModify { target, diff, .. } => {
                self.modify(target, diff).map(|_| ())
            }
            EventPayload::Removed { target } => {
                self.remove(target);
                Ok(())
            }
            EventPayload::PreModify { target, .. } => Err(DomainError::InvalidState {
                reason: format!("PreModify for {target} is never applied"),
            }),
        }
    }
}
