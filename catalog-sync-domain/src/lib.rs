//! 目录事件同步领域层（catalog-sync-domain）
//!
//! 为多节点共享同一份目录/配置的集群提供事件模型与线上格式：
//! - 实体标识与属性快照（`entity`）
//! - 四种生命周期事件与属性差量（`domain_event`）
//! - 集群信封及其 JSON 线上形态（`wire`）
//! - 目录查找、远端应用与资源池等外部协作者接口（`catalog`）
//! - 事件系统（`eventing`）：集群总线与进程内分发通道
//!
//! 本 crate 不包含同步编排逻辑（解析、映射、桥接、一致性保证、缓存清理），
//! 这些位于 `catalog-sync-application`。
//!
pub mod catalog;
pub mod domain_event;
pub mod entity;
pub mod error;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod wire;
