//! 事件桥接（EventBridge）
//!
//! 连接进程内事件通道与集群总线：
//! - 出站：本地事件（PreModify 除外）映射为广播信封发布到总线，发布失败记录并向调用方返回；
//! - 入站：信封还原为本地事件，解析引用后重新发布到本地通道。
//!   回显、发给其他服务的信封、损坏的载荷、总线丢失的消息与处理失败都在这里终止，
//!   不会中断订阅循环。
//!
use crate::error::{SyncError, SyncResult};
use crate::mapper::{self, Filtered};
use crate::resolver::ReferenceResolver;
use async_trait::async_trait;
use catalog_sync_domain::domain_event::{EventKind, InfoEvent};
use catalog_sync_domain::error::{DomainError, DomainResult};
use catalog_sync_domain::eventing::{ClusterBus, EventListener, HandledEventKind, LocalEventChannel};
use catalog_sync_domain::wire::{RemoteEnvelope, SerializedEnvelope};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{error, trace, warn};

/// 分发顺序：本地监听器全部执行后再广播
pub const BRIDGE_ORDER: i32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub published: u64,
    pub publish_failed: u64,
    pub received: u64,
    pub self_origin_dropped: u64,
    pub not_addressed_dropped: u64,
    pub malformed_dropped: u64,
    /// 订阅落后于总线而丢失的消息
    pub lost: u64,
    pub handler_failed: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    publish_failed: AtomicU64,
    received: AtomicU64,
    self_origin_dropped: AtomicU64,
    not_addressed_dropped: AtomicU64,
    malformed_dropped: AtomicU64,
    lost: AtomicU64,
    handler_failed: AtomicU64,
}

pub struct EventBridge {
    service_id: String,
    enabled: AtomicBool,
    bus: Arc<dyn ClusterBus>,
    channel: Arc<LocalEventChannel>,
    resolver: ReferenceResolver,
    counters: Counters,
}

impl EventBridge {
    pub fn new(
        service_id: impl Into<String>,
        enabled: bool,
        bus: Arc<dyn ClusterBus>,
        channel: Arc<LocalEventChannel>,
        resolver: ReferenceResolver,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            enabled: AtomicBool::new(enabled),
            bus,
            channel,
            resolver,
            counters: Counters::default(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// 广播本地事件；返回是否发布
    pub async fn handle_local(&self, event: &InfoEvent) -> SyncResult<bool> {
        if !self.is_enabled() || event.kind().is_process_local() || event.is_remote() {
            return Ok(false);
        }

        let envelope = SerializedEnvelope::from(&mapper::to_remote(event, &self.service_id));
        if let Err(err) = self.bus.publish(&envelope).await {
            self.counters.publish_failed.fetch_add(1, Ordering::Relaxed);
            let target = event.target();
            error!(
                event_id = event.event_id(),
                origin = self.service_id.as_str(),
                kind = %event.kind(),
                object_type = %target.entity_type(),
                object_id = target.id(),
                error = %err,
                "failed to broadcast catalog event"
            );
            return Err(SyncError::Transport {
                event_id: event.event_id().to_string(),
                reason: err.to_string(),
            });
        }

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// 处理一个入站信封；任何失败都只记录，不向外抛出
    pub async fn handle_remote(&self, envelope: &SerializedEnvelope) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.forward(envelope).await {
            match err {
                SyncError::InvalidEnvelope { .. } => {
                    self.counters.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                }
                _ => {
                    self.counters.handler_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            warn!(
                event_id = envelope.event_id(),
                origin = envelope.origin_service(),
                kind = %envelope.event_kind(),
                object_type = %envelope.object_type(),
                object_id = envelope.object_id(),
                error = %err,
                "dropping remote catalog event"
            );
        }
    }

    async fn forward(&self, envelope: &SerializedEnvelope) -> SyncResult<()> {
        let remote =
            RemoteEnvelope::try_from(envelope).map_err(|err| SyncError::InvalidEnvelope {
                envelope_id: envelope.event_id().to_string(),
                reason: err.to_string(),
            })?;

        let event = match mapper::to_local(remote, &self.service_id) {
            Ok(event) => event,
            Err(Filtered::SelfOrigin) => {
                self.counters.self_origin_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(event_id = envelope.event_id(), "ignoring own event echoed by the bus");
                return Ok(());
            }
            Err(Filtered::NotAddressed) => {
                self.counters.not_addressed_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(
                    event_id = envelope.event_id(),
                    destination = %envelope.destination_service(),
                    "ignoring event addressed to another service"
                );
                return Ok(());
            }
        };

        // 缺失的引用由一致性保证器处理
        let (event, _missing) = self.resolver.resolve(&event);
        self.channel.publish(&event).await?;
        Ok(())
    }

    /// 订阅循环：消费信封流直到取消或总线关闭
    pub async fn consume(
        &self,
        mut stream: BoxStream<'static, DomainResult<SerializedEnvelope>>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    break;
                }
                maybe_envelope = stream.next() => {
                    match maybe_envelope {
                        Some(Ok(envelope)) => self.handle_remote(&envelope).await,
                        Some(Err(DomainError::Lagged { skipped })) => {
                            self.counters.lost.fetch_add(skipped, Ordering::Relaxed);
                            warn!(lost = skipped, "subscriber lagged behind the bus, events lost");
                        }
                        Some(Err(err)) => {
                            self.counters.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %err, "dropping undecodable remote payload");
                        }
                        None => {
                            break;
                        }
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            published: self.counters.published.load(Ordering::Relaxed),
            publish_failed: self.counters.publish_failed.load(Ordering::Relaxed),
            received: self.counters.received.load(Ordering::Relaxed),
            self_origin_dropped: self.counters.self_origin_dropped.load(Ordering::Relaxed),
            not_addressed_dropped: self.counters.not_addressed_dropped.load(Ordering::Relaxed),
            malformed_dropped: self.counters.malformed_dropped.load(Ordering::Relaxed),
            lost: self.counters.lost.load(Ordering::Relaxed),
            handler_failed: self.counters.handler_failed.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl EventListener for EventBridge {
    fn listener_name(&self) -> &str {
        "event-bridge"
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        HandledEventKind::Many(vec![
            EventKind::Added,
            EventKind::PostModify,
            EventKind::Removed,
        ])
    }

    fn order(&self) -> i32 {
        BRIDGE_ORDER
    }

    async fn handle(&self, event: &InfoEvent) -> DomainResult<()> {
        self.handle_local(event)
            .await
            .map(|_| ())
            .map_err(DomainError::from)
    }
}
