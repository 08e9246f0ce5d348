//! 同步引擎（CatalogSyncEngine）
//!
//! 组装本地通道、引用解析、桥接、一致性保证、缓存清理与序号跟踪，
//! 并编排长驻任务：
//! - 订阅集群总线，逐个处理入站信封；
//! - 周期清理超龄的待处理操作；
//! - 提供关闭与等待的 `EngineHandle`。
//!
use crate::admin::SyncAdmin;
use crate::bridge::EventBridge;
use crate::config::SyncConfig;
use crate::enforcer::ConsistencyEnforcer;
use crate::error::{SyncError, SyncResult};
use crate::evictor::CacheEvictor;
use crate::resolver::ReferenceResolver;
use crate::sequence::UpdateSequenceTracker;
use bon::bon;
use catalog_sync_domain::catalog::{CatalogLookup, RemoteEventApplier, ResourcePool};
use catalog_sync_domain::domain_event::InfoEvent;
use catalog_sync_domain::error::DomainError;
use catalog_sync_domain::eventing::{ClusterBus, EventListener, LocalEventChannel};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct CatalogSyncEngine {
    config: SyncConfig,
    bus: Arc<dyn ClusterBus>,
    channel: Arc<LocalEventChannel>,
    bridge: Arc<EventBridge>,
    enforcer: Arc<ConsistencyEnforcer>,
    sequences: Arc<UpdateSequenceTracker>,
}

#[bon]
impl CatalogSyncEngine {
    #[builder]
    pub fn new(
        cluster_bus: Arc<dyn ClusterBus>,
        catalog: Arc<dyn CatalogLookup>,
        applier: Arc<dyn RemoteEventApplier>,
        resource_pool: Arc<dyn ResourcePool>,
        #[builder(default)] config: SyncConfig,
        // 额外的本地监听器
        #[builder(default)]
        listeners: Vec<Arc<dyn EventListener>>,
    ) -> Self {
        let channel = Arc::new(LocalEventChannel::new());
        let resolver = ReferenceResolver::new(catalog.clone());
        let sequences = Arc::new(UpdateSequenceTracker::new());

        let evictor = Arc::new(CacheEvictor::new(catalog, resource_pool));
        let enforcer = Arc::new(ConsistencyEnforcer::new(
            resolver.clone(),
            applier,
            sequences.clone(),
            config.max_attempts,
            config.max_age,
        ));
        let bridge = Arc::new(EventBridge::new(
            config.service_id.clone(),
            config.enabled,
            cluster_bus.clone(),
            channel.clone(),
            resolver,
        ));

        channel.register(sequences.clone());
        channel.register(evictor);
        channel.register(enforcer.clone());
        channel.register(bridge.clone());
        for listener in listeners {
            channel.register(listener);
        }

        Self {
            config,
            bus: cluster_bus,
            channel,
            bridge,
            enforcer,
            sequences,
        }
    }
}

impl CatalogSyncEngine {
    pub fn service_id(&self) -> &str {
        &self.config.service_id
    }

    pub fn channel(&self) -> &Arc<LocalEventChannel> {
        &self.channel
    }

    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    pub fn enforcer(&self) -> &Arc<ConsistencyEnforcer> {
        &self.enforcer
    }

    pub fn admin(&self) -> SyncAdmin {
        SyncAdmin::new(
            self.bridge.clone(),
            self.enforcer.clone(),
            self.sequences.clone(),
        )
    }

    /// 变更点调用：本地变更已提交后发布事件
    ///
    /// 本地监听器先于出站广播执行；广播失败以 `SyncError::Transport` 返回，
    /// 即使之前已有本地监听器失败。
    pub async fn publish_local(&self, event: &InfoEvent) -> SyncResult<()> {
        if event.is_remote() {
            return Err(DomainError::invalid_argument(format!(
                "event {} is remote and cannot be published locally",
                event.event_id()
            ))
            .into());
        }

        self.channel.publish(event).await.map_err(|err| match err {
            DomainError::EventBus { reason } => SyncError::Transport {
                event_id: event.event_id().to_string(),
                reason,
            },
            other => SyncError::Domain(other),
        })
    }

    /// 启动订阅与清理任务，返回可用于关闭/等待的句柄
    ///
    /// 返回前已完成订阅，此后发布到总线的信封都会被处理。
    pub async fn start(self: &Arc<Self>) -> EngineHandle {
        let token = CancellationToken::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(2);

        // subscribe worker（长循环）
        {
            let stream = self.bus.subscribe().await;
            let bridge = self.bridge.clone();
            let token = token.clone();
            tasks.push(tokio::spawn(async move {
                bridge.consume(stream, token).await;
            }));
        }

        // sweep worker（周期任务）
        {
            let enforcer = self.enforcer.clone();
            tasks.push(Self::spawn_periodic(
                token.clone(),
                self.config.sweep_interval,
                move || {
                    enforcer.sweep();
                },
            ));
        }

        info!(service_id = self.service_id(), "catalog sync engine started");
        EngineHandle { token, tasks }
    }

    fn spawn_periodic<F>(token: CancellationToken, interval: Duration, mut f: F) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // 第一次 tick 立即完成
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f(),
                }
            }
        })
    }
}

/// 引擎运行句柄：用于优雅关闭与等待任务结束
pub struct EngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
