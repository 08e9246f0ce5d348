//! 集群总线（ClusterBus）协议
//!
//! 定义信封发布与订阅的统一抽象，订阅返回 'static 生命周期的信封流，
//! 以便在异步运行时（如 tokio::spawn）中消费。传输层假定“至少一次”投递，
//! 跨分区无序。
//!
use crate::{error::DomainResult as Result, wire::SerializedEnvelope};
use async_trait::async_trait;
use futures_core::stream::BoxStream;

/// 集群总线：负责广播信封与订阅信封流
#[async_trait]
pub trait ClusterBus: Send + Sync {
    async fn publish(&self, envelope: &SerializedEnvelope) -> Result<()>;

    /// 返回一个 'static 生命周期的信封流；解码失败以 `Err` 形式出现在流中
    async fn subscribe(&self) -> BoxStream<'static, Result<SerializedEnvelope>>;
}
