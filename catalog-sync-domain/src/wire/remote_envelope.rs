use super::destination::Destination;
use crate::domain_event::InfoEvent;

/// 集群信封：来源标记、来源服务、目标服务与事件载荷
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEnvelope {
    /// 不透明的来源标记（进程内的事件源对象不会上线）
    source: String,
    origin_service: String,
    destination: Destination,
    payload: InfoEvent,
}

impl RemoteEnvelope {
    pub fn new(
        source: impl Into<String>,
        origin_service: impl Into<String>,
        destination: Destination,
        payload: InfoEvent,
    ) -> Self {
        Self {
            source: source.into(),
            origin_service: origin_service.into(),
            destination,
            payload,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin_service(&self) -> &str {
        &self.origin_service
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn payload(&self) -> &InfoEvent {
        &self.payload
    }

    pub fn into_payload(self) -> InfoEvent {
        self.payload
    }
}
