use super::event_kind::EventKind;
use super::property_diff::PropertyDiff;
use crate::entity::{CatalogInfo, EntityRef, InfoSnapshot, Reference};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// 事件载荷：四种生命周期变化
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Added {
        object: InfoSnapshot,
        actor_id: Option<String>,
    },
    /// 变更应用前触发，只在进程内传播
    PreModify { target: EntityRef, diff: PropertyDiff },
    /// 变更提交后触发；不支持属性差量的类型携带整体替换对象
    PostModify {
        target: EntityRef,
        diff: PropertyDiff,
        replacement: Option<InfoSnapshot>,
    },
    Removed { target: EntityRef },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Added { .. } => EventKind::Added,
            EventPayload::PreModify { .. } => EventKind::PreModify,
            EventPayload::PostModify { .. } => EventKind::PostModify,
            EventPayload::Removed { .. } => EventKind::Removed,
        }
    }

    pub fn target(&self) -> EntityRef {
        match self {
            EventPayload::Added { object, .. } => object.entity_ref(),
            EventPayload::PreModify { target, .. }
            | EventPayload::PostModify { target, .. }
            | EventPayload::Removed { target } => target.clone(),
        }
    }

    fn validate(&self) -> DomainResult<()> {
        let (target, diff, replacement) = match self {
            EventPayload::Added { .. } | EventPayload::Removed { .. } => return Ok(()),
            EventPayload::PreModify { target, diff } => (target, diff, None),
            EventPayload::PostModify {
                target,
                diff,
                replacement,
            } => (target, diff, Some(replacement)),
        };

        let ty = target.entity_type();
        if !ty.is_modifiable() {
            return Err(DomainError::invalid_argument(format!(
                "modify events are not supported for {ty}"
            )));
        }

        let Some(replacement) = replacement else {
            if ty.supports_granular_diff() && diff.is_empty() {
                return Err(DomainError::invalid_argument(format!(
                    "empty property diff for {target}"
                )));
            }
            return Ok(());
        };

        match (ty.supports_granular_diff(), replacement) {
            (true, Some(_)) => Err(DomainError::invalid_argument(format!(
                "{ty} supports property diffs, full replacement is not allowed"
            ))),
            (true, None) if diff.is_empty() => Err(DomainError::invalid_argument(format!(
                "empty property diff for {target}"
            ))),
            (true, None) => Ok(()),
            (false, None) => Err(DomainError::invalid_argument(format!(
                "{ty} does not support property diffs, a replacement object is required"
            ))),
            (false, Some(object)) if object.entity_ref() != *target => {
                Err(DomainError::invalid_argument(format!(
                    "replacement {} does not match target {target}",
                    object.entity_ref()
                )))
            }
            (false, Some(_)) => Ok(()),
        }
    }
}

/// 目录/配置事件
///
/// 在变更点或反序列化时创建，此后不可变（入站时仅由桥接器置 `is_remote`，
/// 解析器替换引用的解析状态）。
#[derive(Debug, Clone, PartialEq)]
pub struct InfoEvent {
    event_id: String,
    origin: String,
    is_remote: bool,
    update_sequence: Option<i64>,
    occurred_at: DateTime<Utc>,
    payload: EventPayload,
}

impl InfoEvent {
    pub fn added(origin: impl Into<String>, object: InfoSnapshot) -> Self {
        Self::new_unchecked(
            origin.into(),
            EventPayload::Added {
                object,
                actor_id: None,
            },
        )
    }

    pub fn pre_modify(
        origin: impl Into<String>,
        target: EntityRef,
        diff: PropertyDiff,
    ) -> DomainResult<Self> {
        Self::new(
            origin.into(),
            EventPayload::PreModify {
                target: target.normalized(),
                diff,
            },
        )
    }

    pub fn post_modify(
        origin: impl Into<String>,
        target: EntityRef,
        diff: PropertyDiff,
    ) -> DomainResult<Self> {
        Self::new(
            origin.into(),
            EventPayload::PostModify {
                target: target.normalized(),
                diff,
                replacement: None,
            },
        )
    }

    /// 整体替换式的 PostModify，仅用于不支持属性差量的类型
    pub fn replaced(
        origin: impl Into<String>,
        replacement: InfoSnapshot,
        diff: PropertyDiff,
    ) -> DomainResult<Self> {
        Self::new(
            origin.into(),
            EventPayload::PostModify {
                target: replacement.entity_ref(),
                diff,
                replacement: Some(replacement),
            },
        )
    }

    pub fn removed(origin: impl Into<String>, target: EntityRef) -> Self {
        Self::new_unchecked(
            origin.into(),
            EventPayload::Removed {
                target: target.normalized(),
            },
        )
    }

    /// 由线上格式还原，仍执行与构造时相同的校验
    pub(crate) fn restore(
        event_id: String,
        origin: String,
        occurred_at: DateTime<Utc>,
        update_sequence: Option<i64>,
        payload: EventPayload,
    ) -> DomainResult<Self> {
        payload.validate()?;
        Ok(Self {
            event_id,
            origin,
            is_remote: false,
            update_sequence,
            occurred_at,
            payload,
        })
    }

    fn new(origin: String, payload: EventPayload) -> DomainResult<Self> {
        payload.validate()?;
        Ok(Self::new_unchecked(origin, payload))
    }

    fn new_unchecked(origin: String, payload: EventPayload) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            origin,
            is_remote: false,
            update_sequence: None,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn with_actor_id(mut self, actor: impl Into<String>) -> Self {
        if let EventPayload::Added { actor_id, .. } = &mut self.payload {
            *actor_id = Some(actor.into());
        }
        self
    }

    pub fn with_update_sequence(mut self, sequence: i64) -> Self {
        self.update_sequence = Some(sequence);
        self
    }

    /// 标记为来自其他节点
    pub fn into_remote(mut self) -> Self {
        self.is_remote = true;
        self
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn is_local(&self) -> bool {
        !self.is_remote
    }

    pub fn update_sequence(&self) -> Option<i64> {
        self.update_sequence
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn target(&self) -> EntityRef {
        self.payload.target()
    }

    pub fn diff(&self) -> Option<&PropertyDiff> {
        match &self.payload {
            EventPayload::PreModify { diff, .. } | EventPayload::PostModify { diff, .. } => {
                Some(diff)
            }
            _ => None,
        }
    }

    /// Added 的对象或整体替换的对象
    pub fn object(&self) -> Option<&InfoSnapshot> {
        match &self.payload {
            EventPayload::Added { object, .. } => Some(object),
            EventPayload::PostModify { replacement, .. } => replacement.as_ref(),
            _ => None,
        }
    }

    pub fn actor_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Added { actor_id, .. } => actor_id.as_deref(),
            _ => None,
        }
    }

    /// 遍历载荷中的所有引用（差量新旧值、对象自身的引用型字段）
    pub fn for_each_ref<F: FnMut(&Reference)>(&self, f: &mut F) {
        match &self.payload {
            EventPayload::Added { object, .. } => object.for_each_ref(f),
            EventPayload::PreModify { diff, .. } => {
                for change in diff {
                    change.for_each_ref(f);
                }
            }
            EventPayload::PostModify {
                diff, replacement, ..
            } => {
                for change in diff {
                    change.for_each_ref(f);
                }
                if let Some(object) = replacement {
                    object.for_each_ref(f);
                }
            }
            EventPayload::Removed { .. } => {}
        }
    }

    pub fn for_each_ref_mut<F: FnMut(&mut Reference)>(&mut self, f: &mut F) {
        match &mut self.payload {
            EventPayload::Added { object, .. } => object.for_each_ref_mut(f),
            EventPayload::PreModify { diff, .. } => {
                for change in diff.iter_mut() {
                    change.for_each_ref_mut(f);
                }
            }
            EventPayload::PostModify {
                diff, replacement, ..
            } => {
                for change in diff.iter_mut() {
                    change.for_each_ref_mut(f);
                }
                if let Some(object) = replacement {
                    object.for_each_ref_mut(f);
                }
            }
            EventPayload::Removed { .. } => {}
        }
    }

    /// 载荷中仍未解析的引用
    pub fn unresolved_refs(&self) -> BTreeSet<EntityRef> {
        let mut missing = BTreeSet::new();
        self.for_each_ref(&mut |r| {
            if let Reference::Unresolved(entity_ref) = r {
                missing.insert(entity_ref.clone());
            }
        });
        missing
    }

    /// 去掉所有本地对象，只保留引用（用于上线传输）
    pub fn detach_refs(&mut self) {
        self.for_each_ref_mut(&mut |r| r.detach());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityType, PropertyValue};
    use std::sync::Arc;

    fn title_diff() -> PropertyDiff {
        PropertyDiff::new().with("title", Some("A".into()), Some("B".into()))
    }

    #[test]
    fn modify_events_for_allowed_config_types_succeed() {
        for ty in [EntityType::GeoServer, EntityType::Settings, EntityType::Service] {
            let target = EntityRef::new("cfg-1", ty);
            assert!(InfoEvent::pre_modify("n1", target.clone(), title_diff()).is_ok());
            assert!(InfoEvent::post_modify("n1", target, title_diff()).is_ok());
        }

        let logging =
            InfoSnapshot::new("logging", EntityType::Logging).with_property("level", "DEBUG");
        let event = InfoEvent::replaced("n1", logging, PropertyDiff::new()).unwrap();
        assert_eq!(event.target(), EntityRef::logging());
        assert_eq!(event.kind(), EventKind::PostModify);
    }

    #[test]
    fn modify_events_outside_allowed_config_types_fail() {
        for ty in [EntityType::Contact, EntityType::Jai, EntityType::CoverageAccess] {
            let target = EntityRef::new("cfg-1", ty);
            let err = InfoEvent::post_modify("n1", target.clone(), title_diff()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidArgument { .. }));
            let err = InfoEvent::pre_modify("n1", target, title_diff()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidArgument { .. }));
        }
    }

    #[test]
    fn post_modify_requires_a_diff_for_diffable_types() {
        let target = EntityRef::new("ly-1", EntityType::Layer);
        let err = InfoEvent::post_modify("n1", target, PropertyDiff::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
    }

    #[test]
    fn logging_requires_full_replacement() {
        let err = InfoEvent::post_modify("n1", EntityRef::logging(), title_diff()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));

        let style = InfoSnapshot::new("st-1", EntityType::Style);
        let err = InfoEvent::replaced("n1", style, PropertyDiff::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
    }

    #[test]
    fn global_config_events_use_well_known_id() {
        let event = InfoEvent::post_modify(
            "n1",
            EntityRef::new("GeoServerInfo.42", EntityType::GeoServer),
            title_diff(),
        )
        .unwrap();
        assert_eq!(event.target().id(), "geoserver");
    }

    #[test]
    fn unresolved_refs_and_detach() {
        let ws = Arc::new(InfoSnapshot::new("ws-1", EntityType::Workspace));
        let store = InfoSnapshot::new("ds-1", EntityType::DataStore)
            .with_property("workspace", PropertyValue::Ref(Reference::Resolved(ws)))
            .with_property(
                "namespace",
                EntityRef::new("ns-1", EntityType::Namespace),
            );

        let mut event = InfoEvent::added("n1", store).with_actor_id("admin");
        assert_eq!(event.actor_id(), Some("admin"));
        assert_eq!(
            event.unresolved_refs().into_iter().collect::<Vec<_>>(),
            vec![EntityRef::new("ns-1", EntityType::Namespace)]
        );

        event.detach_refs();
        assert_eq!(event.unresolved_refs().len(), 2);
    }
}
