//! 目录事件同步应用层（catalog-sync-application）
//!
//! 在多个节点之间同步目录/配置的生命周期事件：
//! - `mapper`：本地事件与集群信封的互相映射（含自身来源过滤）；
//! - `resolver`：按 `(id, type)` 解析事件中的引用；
//! - `bridge`：本地通道与集群总线之间的桥接；
//! - `enforcer`：依赖乱序到达时的最终一致性保证；
//! - `evictor`：远端变更后的资源池缓存清理；
//! - `sequence`：全局配置更新序号；
//! - `engine` / `admin`：组装、长驻任务与运维接口。
//!
pub mod admin;
pub mod bridge;
pub mod config;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod evictor;
pub mod mapper;
pub mod resolver;
pub mod resource_pool;
pub mod sequence;

pub use admin::{SyncAdmin, SyncStatus};
pub use config::SyncConfig;
pub use engine::{CatalogSyncEngine, EngineHandle};
pub use error::{SyncError, SyncResult};
pub use resource_pool::InMemoryResourcePool;
