//! 内存版集群总线（InMemoryClusterBus）
//!
//! 基于 `tokio::sync::broadcast` 实现的轻量总线，满足 `ClusterBus` 协议：
//! - `publish`：编码为字节后广播，与真实传输一样经过一次编解码；
//! - `subscribe`：返回 `'static` 生命周期信封流，便于在 `tokio::spawn` 中使用；
//!   订阅落后于缓冲区时产出 `DomainError::Lagged`，之后继续接收；
//! - `publish_raw`：直接广播原始字节，用于模拟损坏的载荷。
//!
//! 注意：若无订阅者时发送将被忽略。

use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::ClusterBus;
use crate::wire::SerializedEnvelope;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// 简单的内存集群总线实现，克隆后共享同一个广播通道
#[derive(Clone)]
pub struct InMemoryClusterBus {
    tx: broadcast::Sender<Arc<Vec<u8>>>,
}

impl InMemoryClusterBus {
    /// 创建一个内存总线，`capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish_raw(&self, bytes: Vec<u8>) {
        // 若当前无订阅者，broadcast 的 send 会返回错误，这里视为非致命并忽略
        let _ = self.tx.send(Arc::new(bytes));
    }
}

#[async_trait]
impl ClusterBus for InMemoryClusterBus {
    async fn publish(&self, envelope: &SerializedEnvelope) -> Result<()> {
        self.publish_raw(envelope.to_bytes()?);
        Ok(())
    }

    async fn subscribe(&self) -> BoxStream<'static, Result<SerializedEnvelope>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx).map(|r| match r {
            Ok(bytes) => SerializedEnvelope::from_slice(&bytes),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => Err(DomainError::Lagged { skipped }),
        });
        Box::pin(stream)
    }
}
