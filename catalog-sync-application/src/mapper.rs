//! 事件映射（本地事件 ⇄ 集群信封）
//!
//! 纯函数，无状态。入站过滤（回显、目标不是本节点）只在 `to_local` 中进行。
//!
use catalog_sync_domain::domain_event::InfoEvent;
use catalog_sync_domain::wire::{Destination, RemoteEnvelope};

/// 出站信封的来源标记（进程内的事件源对象不会上线）
pub const SOURCE_MARKER: &str = "catalog";

/// 入站信封被过滤的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtered {
    /// 本节点发出的信封被总线回显
    SelfOrigin,
    /// 信封指定了其他目标服务
    NotAddressed,
}

/// 本地事件 → 广播信封；载荷中的本地对象一律退化为引用
pub fn to_remote(event: &InfoEvent, origin_service: &str) -> RemoteEnvelope {
    let mut payload = event.clone();
    payload.detach_refs();
    RemoteEnvelope::new(
        SOURCE_MARKER,
        origin_service,
        Destination::AllServices,
        payload,
    )
}

/// 集群信封 → 本地事件；回显与发给其他服务的信封不还原
pub fn to_local(envelope: RemoteEnvelope, self_id: &str) -> Result<InfoEvent, Filtered> {
    if is_self_origin(&envelope, self_id) {
        return Err(Filtered::SelfOrigin);
    }
    if !envelope.destination().accepts(self_id) {
        return Err(Filtered::NotAddressed);
    }
    Ok(envelope.into_payload().into_remote())
}

pub fn is_self_origin(envelope: &RemoteEnvelope, self_id: &str) -> bool {
    envelope.origin_service() == self_id
}
