use bon::Builder;
use std::time::Duration;

/// 同步配置，构造引擎时注入
#[derive(Debug, Clone, Builder)]
pub struct SyncConfig {
    /// 本节点标识
    #[builder(into, default = uuid::Uuid::new_v4().to_string())]
    pub service_id: String,
    /// 是否向集群广播本地事件（运行时可通过 `SyncAdmin` 切换）
    #[builder(default = true)]
    pub enabled: bool,
    /// 重新解析后仍有缺失引用的最大次数
    #[builder(default = 16)]
    pub max_attempts: u32,
    /// 待处理操作自入队起的最长存活时间
    #[builder(default = Duration::from_secs(300))]
    pub max_age: Duration,
    /// 清理过期待处理操作的周期
    #[builder(default = Duration::from_secs(30))]
    pub sweep_interval: Duration,
    /// 内存总线的缓冲区容量
    #[builder(default = 1024)]
    pub bus_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
