//! 事件子系统（eventing）
//!
//! 提供跨节点与进程内两条事件通路的基础抽象：
//! - `ClusterBus`：集群总线的统一发布/订阅接口（传输 `SerializedEnvelope`）；
//! - `InMemoryClusterBus`：基于 broadcast 的内存实现，用于测试与演示；
//! - `EventListener`：进程内事件的消费者，声明订阅种类与分发顺序；
//! - `LocalEventChannel`：按事件种类显式分发的本地通道。
//!
//! 该模块不绑定具体传输实现，可对接任意消息系统。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod channel;
pub mod listener;

pub use bus::ClusterBus;
pub use bus_inmemory::InMemoryClusterBus;
pub use channel::LocalEventChannel;
pub use listener::{EventListener, HandledEventKind};
