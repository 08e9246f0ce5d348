use anyhow::Result;
use async_trait::async_trait;
use catalog_sync_application::bridge::EventBridge;
use catalog_sync_application::mapper;
use catalog_sync_application::{CatalogSyncEngine, InMemoryResourcePool, SyncConfig, SyncError};
use catalog_sync_domain::catalog::{CatalogLookup, InMemoryCatalog, RemoteEventApplier};
use catalog_sync_domain::domain_event::{EventKind, InfoEvent, PropertyDiff};
use catalog_sync_domain::entity::{EntityRef, EntityType, InfoSnapshot};
use catalog_sync_domain::error::{DomainError, DomainResult};
use catalog_sync_domain::eventing::{ClusterBus, HandledEventKind, InMemoryClusterBus};
use catalog_sync_domain::wire::{Destination, RemoteEnvelope, SerializedEnvelope};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// 记录应用顺序的目录
struct RecordingApplier {
    catalog: Arc<InMemoryCatalog>,
    applied: Mutex<Vec<String>>,
}

#[async_trait]
impl RemoteEventApplier for RecordingApplier {
    async fn apply(&self, event: &InfoEvent) -> DomainResult<()> {
        self.applied.lock().push(event.target().id().to_string());
        self.catalog.apply(event).await
    }
}

struct Node {
    catalog: Arc<InMemoryCatalog>,
    applier: Arc<RecordingApplier>,
    pool: Arc<InMemoryResourcePool>,
    engine: Arc<CatalogSyncEngine>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Node {
    fn new(bus: Arc<dyn ClusterBus>, service_id: &str) -> Self {
        Self::with_config(bus, SyncConfig::builder().service_id(service_id).build())
    }

    fn with_config(bus: Arc<dyn ClusterBus>, config: SyncConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let applier = Arc::new(RecordingApplier {
            catalog: catalog.clone(),
            applied: Mutex::new(Vec::new()),
        });
        let pool = Arc::new(InMemoryResourcePool::new());
        let engine = Arc::new(
            CatalogSyncEngine::builder()
                .cluster_bus(bus)
                .catalog(catalog.clone())
                .applier(applier.clone())
                .resource_pool(pool.clone())
                .config(config)
                .build(),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        engine
            .channel()
            .register_fn("spy", HandledEventKind::All, 50, move |event| {
                log.lock().push(event.event_id().to_string());
                Ok(())
            });

        Self {
            catalog,
            applier,
            pool,
            engine,
            seen,
        }
    }

    fn bridge(&self) -> &Arc<EventBridge> {
        self.engine.bridge()
    }

    /// 模拟变更点：先写本地目录，再发布事件
    async fn add(&self, object: InfoSnapshot) -> Result<InfoEvent> {
        self.catalog.add(object.clone());
        let event = InfoEvent::added(self.engine.service_id(), object);
        self.engine.publish_local(&event).await?;
        Ok(event)
    }
}

fn envelope_from(origin: &str, event: &InfoEvent) -> SerializedEnvelope {
    SerializedEnvelope::from(&mapper::to_remote(event, origin))
}

async fn eventually(condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

fn workspace() -> InfoSnapshot {
    InfoSnapshot::new("ws-1", EntityType::Workspace).with_property("name", "topp")
}

fn store() -> InfoSnapshot {
    InfoSnapshot::new("ds-1", EntityType::DataStore)
        .with_property("name", "roads")
        .with_property("workspace", EntityRef::new("ws-1", EntityType::Workspace))
}

#[tokio::test]
async fn own_events_are_observed_exactly_once() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let a = Node::new(Arc::new(bus.clone()), "node-a");
    let b = Node::new(Arc::new(bus.clone()), "node-b");
    let handle_a = a.engine.start().await;
    let handle_b = b.engine.start().await;

    let event = a.add(workspace()).await?;

    let ws = EntityRef::new("ws-1", EntityType::Workspace);
    assert!(eventually(|| b.catalog.contains(&ws)).await);
    assert!(eventually(|| a.bridge().stats().self_origin_dropped == 1).await);

    assert_eq!(*a.seen.lock(), vec![event.event_id().to_string()]);
    assert_eq!(*b.seen.lock(), vec![event.event_id().to_string()]);
    assert_eq!(b.bridge().stats().self_origin_dropped, 0);

    handle_a.shutdown();
    handle_b.shutdown();
    Ok(())
}

#[tokio::test]
async fn reversed_dependency_delivery_converges() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");

    let added_ws = InfoEvent::added("node-a", workspace());
    let added_store = InfoEvent::added("node-a", store());

    b.bridge()
        .handle_remote(&envelope_from("node-a", &added_store))
        .await;
    assert_eq!(b.engine.enforcer().pending_len(), 1);

    b.bridge()
        .handle_remote(&envelope_from("node-a", &added_ws))
        .await;

    assert_eq!(b.engine.enforcer().pending_len(), 0);
    let ds = b
        .catalog
        .get(&EntityRef::new("ds-1", EntityType::DataStore))
        .expect("store applied");
    let workspace_ref = ds
        .property("workspace")
        .and_then(|value| value.as_reference())
        .expect("workspace reference");
    assert!(workspace_ref.is_resolved());
    assert_eq!(
        workspace_ref.entity_ref(),
        EntityRef::new("ws-1", EntityType::Workspace)
    );
    assert!(b.catalog.find(&workspace_ref.entity_ref()).is_some());
    Ok(())
}

#[tokio::test]
async fn replay_on_a_shared_dependency_is_fifo() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");

    let first = InfoSnapshot::new("ds-1", EntityType::DataStore)
        .with_property("workspace", EntityRef::new("ws-1", EntityType::Workspace));
    let second = InfoSnapshot::new("ds-2", EntityType::DataStore)
        .with_property("workspace", EntityRef::new("ws-1", EntityType::Workspace));

    for object in [first, second, workspace()] {
        let event = InfoEvent::added("node-a", object);
        b.bridge()
            .handle_remote(&envelope_from("node-a", &event))
            .await;
    }

    assert_eq!(*b.applier.applied.lock(), vec!["ws-1", "ds-1", "ds-2"]);
    Ok(())
}

/// 统计 WARN 级别的日志条数
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn a_dependency_that_never_arrives_warns_once() -> Result<()> {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let bus = InMemoryClusterBus::new(64);
    let config = SyncConfig::builder()
        .service_id("node-b")
        .max_age(Duration::from_secs(60))
        .build();
    let b = Node::with_config(Arc::new(bus), config);

    let orphan = InfoEvent::added("node-a", store());
    b.bridge()
        .handle_remote(&envelope_from("node-a", &orphan))
        .await;
    assert_eq!(b.engine.enforcer().pending_len(), 1);
    assert_eq!(warnings.load(Ordering::SeqCst), 0);

    let later = chrono::Utc::now() + chrono::Duration::seconds(120);
    assert_eq!(b.engine.enforcer().sweep_at(later), 1);
    assert_eq!(b.engine.enforcer().sweep_at(later), 0);

    assert_eq!(b.engine.enforcer().pending_len(), 0);
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
    assert_eq!(b.engine.admin().enforcer_stats().dropped, 1);
    Ok(())
}

#[tokio::test]
async fn only_remote_modifications_evict() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");
    let ds = EntityRef::new("ds-1", EntityType::DataStore);
    b.catalog.add(InfoSnapshot::new("ds-1", EntityType::DataStore));
    b.pool.cache(ds.clone());

    let diff = PropertyDiff::new().with("enabled", Some(true.into()), Some(false.into()));
    let local = InfoEvent::post_modify("node-b", ds.clone(), diff.clone())?;
    b.engine.publish_local(&local).await?;
    assert_eq!(b.pool.stores_cleared(), 0);
    assert!(b.pool.is_cached(&ds));

    let remote = InfoEvent::post_modify("node-a", ds.clone(), diff)?;
    b.bridge()
        .handle_remote(&envelope_from("node-a", &remote))
        .await;
    assert_eq!(b.pool.stores_cleared(), 1);
    assert!(!b.pool.is_cached(&ds));
    Ok(())
}

#[test]
fn modify_events_are_limited_to_supported_config_types() {
    let diff = || PropertyDiff::new().with("title", None, Some("x".into()));

    for ty in [EntityType::Contact, EntityType::Jai, EntityType::CoverageAccess] {
        let err = InfoEvent::post_modify("node-a", EntityRef::new("c-1", ty), diff()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
        let err = InfoEvent::pre_modify("node-a", EntityRef::new("c-1", ty), diff()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
    }

    for ty in [EntityType::GeoServer, EntityType::Settings, EntityType::Service] {
        assert!(InfoEvent::post_modify("node-a", EntityRef::new("c-1", ty), diff()).is_ok());
    }
    let logging = InfoSnapshot::new("logging", EntityType::Logging).with_property("level", "DEBUG");
    assert!(InfoEvent::replaced("node-a", logging, PropertyDiff::new()).is_ok());
}

#[tokio::test]
async fn property_diffs_cross_the_cluster_intact() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let a = Node::new(Arc::new(bus.clone()), "node-a");
    let b = Node::new(Arc::new(bus.clone()), "node-b");
    let received = Arc::new(Mutex::new(None));
    let slot = received.clone();
    b.engine.channel().register_fn(
        "diff-spy",
        HandledEventKind::One(EventKind::PostModify),
        0,
        move |event| {
            *slot.lock() = event.diff().cloned();
            Ok(())
        },
    );
    let _handle_b = b.engine.start().await;

    let layer = EntityRef::new("ly-1", EntityType::Layer);
    b.catalog.add(InfoSnapshot::new("ly-1", EntityType::Layer).with_property("title", "A"));
    let diff = PropertyDiff::new()
        .with("title", Some("A".into()), Some("B".into()))
        .with("abstract", None, Some("roads".into()));
    let event = InfoEvent::post_modify("node-a", layer.clone(), diff.clone())?;
    a.engine.publish_local(&event).await?;

    assert!(eventually(|| received.lock().is_some()).await);
    let got = received.lock().clone().expect("diff received");
    assert_eq!(got, diff);
    assert_eq!(got.names().collect::<Vec<_>>(), vec!["title", "abstract"]);
    assert_eq!(
        b.catalog
            .get(&layer)
            .and_then(|ly| ly.property("title").and_then(|v| v.as_str().map(str::to_owned))),
        Some("B".to_string())
    );
    Ok(())
}

struct UnreachableBus;

#[async_trait]
impl ClusterBus for UnreachableBus {
    async fn publish(&self, _envelope: &SerializedEnvelope) -> DomainResult<()> {
        Err(DomainError::event_bus("connection refused"))
    }

    async fn subscribe(&self) -> BoxStream<'static, DomainResult<SerializedEnvelope>> {
        Box::pin(futures_util::stream::empty())
    }
}

#[tokio::test]
async fn broadcast_failures_surface_to_the_mutation_site() {
    let a = Node::new(Arc::new(UnreachableBus), "node-a");

    let err = a.add(workspace()).await.unwrap_err();
    let err = err.downcast::<SyncError>().expect("sync error");
    assert!(matches!(err, SyncError::Transport { .. }));
    // 本地监听器已经收到事件
    assert_eq!(a.seen.lock().len(), 1);
    assert_eq!(a.engine.admin().bridge_stats().publish_failed, 1);
}

#[tokio::test]
async fn disabled_nodes_stay_silent() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let a = Node::new(Arc::new(bus.clone()), "node-a");
    let mut rx = bus.subscribe().await;

    a.engine.admin().set_enabled(false);
    assert!(!a.engine.admin().is_enabled());
    a.add(workspace()).await?;

    a.engine.admin().set_enabled(true);
    let event = a.add(store()).await?;

    let first = rx.next().await.expect("envelope")?;
    assert_eq!(first.event_id(), event.event_id());
    assert_eq!(a.engine.admin().bridge_stats().published, 1);
    Ok(())
}

#[tokio::test]
async fn malformed_payloads_are_dropped_without_stopping_the_loop() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus.clone()), "node-b");
    let _handle = b.engine.start().await;

    bus.publish_raw(b"{not json".to_vec());
    let missing_object = SerializedEnvelope::builder()
        .event_id("e-1".into())
        .origin_service("node-a".into())
        .source("catalog".into())
        .event_kind(EventKind::Added)
        .object_id("ws-9".into())
        .object_type(EntityType::Workspace)
        .occurred_at(chrono::Utc::now())
        .build();
    bus.publish(&missing_object).await?;
    bus.publish(&envelope_from("node-a", &InfoEvent::added("node-a", workspace())))
        .await?;

    let ws = EntityRef::new("ws-1", EntityType::Workspace);
    assert!(eventually(|| b.catalog.contains(&ws)).await);
    assert_eq!(b.engine.admin().bridge_stats().malformed_dropped, 2);
    Ok(())
}

#[tokio::test]
async fn stale_global_configuration_is_ignored() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");
    b.catalog
        .add(InfoSnapshot::new("geoserver", EntityType::GeoServer).with_property("verbose", false));

    let modify = |sequence: i64, verbose: bool| -> Result<InfoEvent> {
        let diff = PropertyDiff::new().with("verbose", None, Some(verbose.into()));
        let event = InfoEvent::post_modify("node-a", EntityRef::global(), diff)?;
        Ok(event.with_update_sequence(sequence))
    };

    b.bridge()
        .handle_remote(&envelope_from("node-a", &modify(5, true)?))
        .await;
    b.bridge()
        .handle_remote(&envelope_from("node-a", &modify(3, false)?))
        .await;

    let status = b.engine.admin().sequence_status();
    assert_eq!((status.local, status.global, status.lag), (5, 5, 0));
    let global = b.catalog.get(&EntityRef::global()).expect("global config");
    assert_eq!(
        global.property("verbose").and_then(|v| v.as_scalar()).cloned(),
        Some(serde_json::Value::Bool(true))
    );
    assert_eq!(b.engine.admin().enforcer_stats().stale_discarded, 1);
    Ok(())
}

#[tokio::test]
async fn queued_global_update_does_not_overwrite_a_newer_one() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");
    b.catalog
        .add(InfoSnapshot::new("geoserver", EntityType::GeoServer).with_property("title", "v0"));

    let older = PropertyDiff::new()
        .with("title", None, Some("v5".into()))
        .with(
            "defaultWorkspace",
            None,
            Some(EntityRef::new("ws-1", EntityType::Workspace).into()),
        );
    let older = InfoEvent::post_modify("node-a", EntityRef::global(), older)?;
    let newer = PropertyDiff::new().with("title", None, Some("v7".into()));
    let newer = InfoEvent::post_modify("node-a", EntityRef::global(), newer)?;

    for event in [
        older.with_update_sequence(5),
        newer.with_update_sequence(7),
        InfoEvent::added("node-a", workspace()),
    ] {
        b.bridge()
            .handle_remote(&envelope_from("node-a", &event))
            .await;
    }

    let global = b.catalog.get(&EntityRef::global()).expect("global config");
    assert_eq!(
        global.property("title").and_then(|v| v.as_str().map(str::to_owned)),
        Some("v7".to_string())
    );
    assert_eq!(b.engine.admin().sequence_status().local, 7);
    assert_eq!(b.engine.enforcer().pending_len(), 0);
    assert_eq!(b.engine.admin().enforcer_stats().stale_discarded, 1);
    Ok(())
}

#[tokio::test]
async fn last_arrival_wins_for_ordinary_objects() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");
    let layer = EntityRef::new("ly-1", EntityType::Layer);
    b.catalog.add(InfoSnapshot::new("ly-1", EntityType::Layer).with_property("title", "A"));

    let modify = |title: &str, sequence: i64| -> Result<InfoEvent> {
        let diff = PropertyDiff::new().with("title", None, Some(title.into()));
        let event = InfoEvent::post_modify("node-a", layer.clone(), diff)?;
        Ok(event.with_update_sequence(sequence))
    };

    // 较新的修改先到，较旧的后到
    b.bridge()
        .handle_remote(&envelope_from("node-a", &modify("newer", 9)?))
        .await;
    b.bridge()
        .handle_remote(&envelope_from("node-a", &modify("older", 4)?))
        .await;

    let title = b
        .catalog
        .get(&layer)
        .and_then(|ly| ly.property("title").and_then(|v| v.as_str().map(str::to_owned)));
    assert_eq!(title, Some("older".to_string()));
    let stats = b.engine.admin().enforcer_stats();
    assert_eq!((stats.applied, stats.stale_discarded), (2, 0));
    Ok(())
}

#[tokio::test]
async fn envelopes_addressed_elsewhere_are_ignored() -> Result<()> {
    let bus = InMemoryClusterBus::new(64);
    let b = Node::new(Arc::new(bus), "node-b");

    let event = InfoEvent::added("node-a", workspace());
    let envelope = RemoteEnvelope::new(
        mapper::SOURCE_MARKER,
        "node-a",
        Destination::Service("node-c".to_string()),
        event,
    );
    b.bridge()
        .handle_remote(&SerializedEnvelope::from(&envelope))
        .await;

    assert!(!b.catalog.contains(&EntityRef::new("ws-1", EntityType::Workspace)));
    assert!(b.seen.lock().is_empty());
    assert_eq!(b.bridge().stats().not_addressed_dropped, 1);
    Ok(())
}
