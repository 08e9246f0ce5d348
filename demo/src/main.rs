use catalog_sync_application::mapper;
use catalog_sync_application::{CatalogSyncEngine, InMemoryResourcePool, SyncConfig};
use catalog_sync_domain::catalog::InMemoryCatalog;
use catalog_sync_domain::domain_event::{InfoEvent, PropertyDiff};
use catalog_sync_domain::entity::{EntityRef, EntityType, InfoSnapshot};
use catalog_sync_domain::eventing::InMemoryClusterBus;
use catalog_sync_domain::wire::SerializedEnvelope;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Node {
    catalog: Arc<InMemoryCatalog>,
    pool: Arc<InMemoryResourcePool>,
    engine: Arc<CatalogSyncEngine>,
}

impl Node {
    fn new(bus: &InMemoryClusterBus, service_id: &str) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let pool = Arc::new(InMemoryResourcePool::new());
        let config = SyncConfig::builder()
            .service_id(service_id)
            .bus_capacity(256)
            .build();
        let engine = CatalogSyncEngine::builder()
            .cluster_bus(Arc::new(bus.clone()))
            .catalog(catalog.clone())
            .applier(catalog.clone())
            .resource_pool(pool.clone())
            .config(config)
            .build();
        Self {
            catalog,
            pool,
            engine: Arc::new(engine),
        }
    }

    /// 变更点：先写本地目录，再发布事件
    async fn add(&self, object: InfoSnapshot) -> anyhow::Result<InfoEvent> {
        self.catalog.add(object.clone());
        let event = InfoEvent::added(self.engine.service_id(), object);
        self.engine.publish_local(&event).await?;
        Ok(event)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bus = InMemoryClusterBus::new(SyncConfig::default().bus_capacity);
    let a = Node::new(&bus, "node-a");
    let b = Node::new(&bus, "node-b");
    let handle_a = a.engine.start().await;
    let handle_b = b.engine.start().await;

    // 1. 正常广播：node-a 新增工作区与数据源，node-b 收到后应用
    let workspace = InfoSnapshot::new("ws-1", EntityType::Workspace).with_property("name", "topp");
    let store = InfoSnapshot::new("ds-1", EntityType::DataStore)
        .with_property("name", "roads")
        .with_property("workspace", EntityRef::new("ws-1", EntityType::Workspace));
    a.add(workspace).await?;
    a.add(store).await?;
    settle().await;
    info!(objects = b.catalog.len(), "node-b after broadcast");

    // 2. 乱序到达：图层先于其引用的要素类型到达 node-b
    let feature_type = InfoSnapshot::new("ft-1", EntityType::FeatureType)
        .with_property("store", EntityRef::new("ds-1", EntityType::DataStore));
    let layer = InfoSnapshot::new("ly-1", EntityType::Layer)
        .with_property("resource", EntityRef::new("ft-1", EntityType::FeatureType));
    a.catalog.add(feature_type.clone());
    a.catalog.add(layer.clone());
    let added_ft = InfoEvent::added("node-a", feature_type);
    let added_layer = InfoEvent::added("node-a", layer);
    for event in [&added_layer, &added_ft] {
        let envelope = SerializedEnvelope::from(&mapper::to_remote(event, "node-a"));
        b.engine.bridge().handle_remote(&envelope).await;
    }
    info!(
        layer = b.catalog.contains(&EntityRef::new("ly-1", EntityType::Layer)),
        pending = b.engine.enforcer().pending_len(),
        "node-b after reversed delivery"
    );

    // 3. 远端修改清理缓存
    let ds = EntityRef::new("ds-1", EntityType::DataStore);
    b.pool.cache(ds.clone());
    let diff = PropertyDiff::new().with("name", Some("roads".into()), Some("highways".into()));
    a.catalog.modify(&ds, &diff)?;
    a.engine
        .publish_local(&InfoEvent::post_modify("node-a", ds.clone(), diff)?)
        .await?;
    settle().await;
    info!(
        cached = b.pool.is_cached(&ds),
        stores_cleared = b.pool.stores_cleared(),
        "node-b resource pool after remote modify"
    );

    // 4. 全局配置序号
    a.catalog
        .add(InfoSnapshot::new("geoserver", EntityType::GeoServer).with_property("verbose", false));
    b.catalog
        .add(InfoSnapshot::new("geoserver", EntityType::GeoServer).with_property("verbose", false));
    let diff = PropertyDiff::new().with("verbose", Some(false.into()), Some(true.into()));
    a.engine
        .publish_local(
            &InfoEvent::post_modify("node-a", EntityRef::global(), diff)?.with_update_sequence(1),
        )
        .await?;
    settle().await;

    for node in [&a, &b] {
        let status = node.engine.admin().status();
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    handle_a.shutdown();
    handle_b.shutdown();
    handle_a.join().await;
    handle_b.join().await;
    Ok(())
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
