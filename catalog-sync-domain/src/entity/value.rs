use super::entity_ref::EntityRef;
use super::info::CatalogInfo;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 引用型字段的取值：未解析的占位引用，或已解析到的本地对象
///
/// 线上只传输 `EntityRef`，反序列化得到的一律是 `Unresolved`。
/// 相等性按 `EntityRef` 判断。
#[derive(Clone)]
pub enum Reference {
    Unresolved(EntityRef),
    Resolved(Arc<dyn CatalogInfo>),
}

impl Reference {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Reference::Unresolved(r) => r.clone(),
            Reference::Resolved(info) => info.entity_ref(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&Arc<dyn CatalogInfo>> {
        match self {
            Reference::Resolved(info) => Some(info),
            Reference::Unresolved(_) => None,
        }
    }

    /// 丢弃本地对象，只保留引用
    pub fn detach(&mut self) {
        if let Reference::Resolved(info) = self {
            *self = Reference::Unresolved(info.entity_ref());
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.entity_ref() == other.entity_ref()
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Unresolved(r) => write!(f, "Unresolved({r})"),
            Reference::Resolved(info) => write!(f, "Resolved({})", info.entity_ref()),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entity_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EntityRef::deserialize(deserializer).map(Reference::Unresolved)
    }
}

/// 属性值：标量、引用、集合或嵌套映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyValue {
    Scalar(serde_json::Value),
    Ref(Reference),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn reference(r: EntityRef) -> Self {
        PropertyValue::Ref(Reference::Unresolved(r))
    }

    /// 由多个引用组成的集合属性
    pub fn references(refs: impl IntoIterator<Item = EntityRef>) -> Self {
        PropertyValue::List(refs.into_iter().map(PropertyValue::reference).collect())
    }

    pub fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            PropertyValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(|v| v.as_str())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(|v| v.as_i64())
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            PropertyValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// 深度遍历所有引用（集合内的每个元素单独访问）
    pub fn for_each_ref<F: FnMut(&Reference)>(&self, f: &mut F) {
        match self {
            PropertyValue::Scalar(_) => {}
            PropertyValue::Ref(r) => f(r),
            PropertyValue::List(items) => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            PropertyValue::Map(map) => {
                for value in map.values() {
                    value.for_each_ref(f);
                }
            }
        }
    }

    pub fn for_each_ref_mut<F: FnMut(&mut Reference)>(&mut self, f: &mut F) {
        match self {
            PropertyValue::Scalar(_) => {}
            PropertyValue::Ref(r) => f(r),
            PropertyValue::List(items) => {
                for item in items {
                    item.for_each_ref_mut(f);
                }
            }
            PropertyValue::Map(map) => {
                for value in map.values_mut() {
                    value.for_each_ref_mut(f);
                }
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Scalar(value.into())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Scalar(value.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Scalar(value.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Scalar(value.into())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<EntityRef> for PropertyValue {
    fn from(value: EntityRef) -> Self {
        PropertyValue::reference(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityType, InfoSnapshot};

    #[test]
    fn reference_serializes_as_plain_entity_ref() {
        let ws = Arc::new(InfoSnapshot::new("ws-1", EntityType::Workspace));
        let resolved = PropertyValue::Ref(Reference::Resolved(ws));
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ref": {"objectId": "ws-1", "objectType": "workspace"}})
        );

        let back: PropertyValue = serde_json::from_value(json).unwrap();
        assert!(!back.as_reference().unwrap().is_resolved());
        assert_eq!(back, resolved);
    }

    #[test]
    fn for_each_ref_visits_nested_collections() {
        let value = PropertyValue::Map(BTreeMap::from([
            (
                "styles".to_string(),
                PropertyValue::references([
                    EntityRef::new("s-1", EntityType::Style),
                    EntityRef::new("s-2", EntityType::Style),
                ]),
            ),
            ("title".to_string(), PropertyValue::from("roads")),
        ]));

        let mut seen = Vec::new();
        value.for_each_ref(&mut |r| seen.push(r.entity_ref().id().to_string()));
        assert_eq!(seen, vec!["s-1", "s-2"]);
    }
}
