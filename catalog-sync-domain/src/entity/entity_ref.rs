use super::entity_type::{EntityCategory, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体引用：以 `(id, type)` 标识任意目录/配置对象，不持有对象本身
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "objectId")]
    id: String,
    #[serde(rename = "objectType")]
    entity_type: EntityType,
}

impl EntityRef {
    /// 创建引用；配置单例的标识会被替换为固定标识
    pub fn new(id: impl Into<String>, entity_type: EntityType) -> Self {
        let id = match entity_type.well_known_id() {
            Some(fixed) => fixed.to_string(),
            None => id.into(),
        };
        Self { id, entity_type }
    }

    /// 全局配置单例的引用
    pub fn global() -> Self {
        Self::new("", EntityType::GeoServer)
    }

    /// 日志配置单例的引用
    pub fn logging() -> Self {
        Self::new("", EntityType::Logging)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn is_a(&self, category: EntityCategory) -> bool {
        self.entity_type.is_a(category)
    }

    /// 重新套用单例标识替换（用于反序列化得到的引用）
    pub fn normalized(self) -> Self {
        Self::new(self.id, self.entity_type)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}
