//! 线上信封（SerializedEnvelope）
//!
//! 定义事件在集群总线上的标准形态与在 `RemoteEnvelope` 间的转换。
//! 还原时复用事件构造的校验，非法载荷（缺少对象、空差量、非法修改目标）
//! 在这里被拒绝。PreModify 只在进程内分发，入站的 PreModify 同样视为非法。
//!
use super::destination::Destination;
use super::remote_envelope::RemoteEnvelope;
use crate::domain_event::{EventKind, EventPayload, InfoEvent, PropertyDiff};
use crate::entity::{CatalogInfo, EntityRef, EntityType, InfoSnapshot};
use crate::error::{DomainError, DomainResult};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEnvelope {
    /// 事件唯一标识，用于诊断日志
    event_id: String,
    /// 来源服务标识
    origin_service: String,
    /// 目标服务，`**` 表示广播
    #[builder(default)]
    destination_service: Destination,
    /// 不透明的来源标记
    source: String,
    event_kind: EventKind,
    object_id: String,
    object_type: EntityType,
    /// 仅 Added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_id: Option<String>,
    /// 全局配置的更新序号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_sequence: Option<i64>,
    occurred_at: DateTime<Utc>,
    /// 仅 PostModify（以及进程内的 PreModify）
    #[serde(default, skip_serializing_if = "PropertyDiff::is_empty")]
    #[builder(default)]
    property_diff: PropertyDiff,
    /// Added 的对象，或整体替换的对象
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object: Option<InfoSnapshot>,
}

impl SerializedEnvelope {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn origin_service(&self) -> &str {
        &self.origin_service
    }

    pub fn destination_service(&self) -> &Destination {
        &self.destination_service
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn object_type(&self) -> EntityType {
        self.object_type
    }

    pub fn update_sequence(&self) -> Option<i64> {
        self.update_sequence
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn property_diff(&self) -> &PropertyDiff {
        &self.property_diff
    }

    pub fn object(&self) -> Option<&InfoSnapshot> {
        self.object.as_ref()
    }

    pub fn to_bytes(&self) -> DomainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> DomainResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<&RemoteEnvelope> for SerializedEnvelope {
    fn from(envelope: &RemoteEnvelope) -> Self {
        let event = envelope.payload();
        let target = event.target();

        let (actor_id, property_diff, object) = match event.payload() {
            EventPayload::Added { object, actor_id } => {
                (actor_id.clone(), PropertyDiff::new(), Some(object.clone()))
            }
            EventPayload::PreModify { diff, .. } => (None, diff.clone(), None),
            EventPayload::PostModify {
                diff, replacement, ..
            } => (None, diff.clone(), replacement.clone()),
            EventPayload::Removed { .. } => (None, PropertyDiff::new(), None),
        };

        SerializedEnvelope {
            event_id: event.event_id().to_string(),
            origin_service: envelope.origin_service().to_string(),
            destination_service: envelope.destination().clone(),
            source: envelope.source().to_string(),
            event_kind: event.kind(),
            object_id: target.id().to_string(),
            object_type: target.entity_type(),
            actor_id,
            update_sequence: event.update_sequence(),
            occurred_at: event.occurred_at(),
            property_diff,
            object,
        }
    }
}

impl TryFrom<&SerializedEnvelope> for RemoteEnvelope {
    type Error = DomainError;

    fn try_from(value: &SerializedEnvelope) -> Result<Self, Self::Error> {
        let target = EntityRef::new(value.object_id.clone(), value.object_type);

        let payload = match value.event_kind {
            EventKind::Added => {
                let Some(object) = value.object.clone() else {
                    return Err(DomainError::invalid_argument(format!(
                        "Added event {} carries no object",
                        value.event_id
                    )));
                };
                if object.entity_ref() != target {
                    return Err(DomainError::invalid_argument(format!(
                        "Added event {} object {} does not match {target}",
                        value.event_id,
                        object.entity_ref()
                    )));
                }
                EventPayload::Added {
                    object,
                    actor_id: value.actor_id.clone(),
                }
            }
            EventKind::PreModify => {
                return Err(DomainError::invalid_argument(format!(
                    "PreModify event {} never leaves its process",
                    value.event_id
                )));
            }
            EventKind::PostModify => EventPayload::PostModify {
                target,
                diff: value.property_diff.clone(),
                replacement: value.object.clone(),
            },
            EventKind::Removed => EventPayload::Removed { target },
        };

        let event = InfoEvent::restore(
            value.event_id.clone(),
            value.origin_service.clone(),
            value.occurred_at,
            value.update_sequence,
            payload,
        )?;

        Ok(RemoteEnvelope::new(
            value.source.clone(),
            value.origin_service.clone(),
            value.destination_service.clone(),
            event,
        ))
    }
}
