use super::entity_ref::EntityRef;
use super::entity_type::EntityType;
use super::value::{PropertyValue, Reference};
use crate::domain_event::PropertyDiff;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 本地目录/配置对象的最小接口（对象模型本身由外部提供）
pub trait CatalogInfo: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn entity_type(&self) -> EntityType;

    /// 对象的引用；配置单例使用固定标识
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.id(), self.entity_type())
    }
}

/// 对象快照：可在线上传输的属性集合，同时也是 `CatalogInfo` 的一种实现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSnapshot {
    id: String,
    #[serde(rename = "type")]
    entity_type: EntityType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyValue>,
}

impl InfoSnapshot {
    pub fn new(id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            entity_type,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// 设置属性；`None` 表示删除
    pub fn set_property(&mut self, name: impl Into<String>, value: Option<PropertyValue>) {
        let name = name.into();
        match value {
            Some(v) => {
                self.properties.insert(name, v);
            }
            None => {
                self.properties.remove(&name);
            }
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// 按变更顺序应用差量，后出现的同名变更覆盖先前的值
    pub fn apply_diff(&mut self, diff: &PropertyDiff) {
        for change in diff {
            self.set_property(change.name(), change.new_value().cloned());
        }
    }

    /// 对象自身引用型字段指向的实体
    pub fn references(&self) -> Vec<EntityRef> {
        let mut refs = Vec::new();
        self.for_each_ref(&mut |r| refs.push(r.entity_ref()));
        refs
    }

    pub fn for_each_ref<F: FnMut(&Reference)>(&self, f: &mut F) {
        for value in self.properties.values() {
            value.for_each_ref(f);
        }
    }

    pub fn for_each_ref_mut<F: FnMut(&mut Reference)>(&mut self, f: &mut F) {
        for value in self.properties.values_mut() {
            value.for_each_ref_mut(f);
        }
    }
}

impl CatalogInfo for InfoSnapshot {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity_type(&self) -> EntityType {
        self.entity_type
    }
}
