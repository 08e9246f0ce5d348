//! 运维接口（SyncAdmin）
//!
//! 出站广播开关与只读状态：全局配置序号（本地/全局/滞后）、一致性保证器与桥接器计数。
//!
use crate::bridge::{BridgeStats, EventBridge};
use crate::enforcer::{ConsistencyEnforcer, EnforcerStats};
use crate::sequence::{SequenceStatus, UpdateSequenceTracker};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub service_id: String,
    pub enabled: bool,
    pub sequence: SequenceStatus,
    pub enforcer: EnforcerStats,
    pub bridge: BridgeStats,
}

#[derive(Clone)]
pub struct SyncAdmin {
    bridge: Arc<EventBridge>,
    enforcer: Arc<ConsistencyEnforcer>,
    sequences: Arc<UpdateSequenceTracker>,
}

impl SyncAdmin {
    pub(crate) fn new(
        bridge: Arc<EventBridge>,
        enforcer: Arc<ConsistencyEnforcer>,
        sequences: Arc<UpdateSequenceTracker>,
    ) -> Self {
        Self {
            bridge,
            enforcer,
            sequences,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bridge.is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.bridge.set_enabled(enabled);
        info!(
            service_id = self.bridge.service_id(),
            enabled, "outbound catalog event broadcasting toggled"
        );
    }

    pub fn sequence_status(&self) -> SequenceStatus {
        self.sequences.status()
    }

    pub fn enforcer_stats(&self) -> EnforcerStats {
        self.enforcer.stats()
    }

    pub fn bridge_stats(&self) -> BridgeStats {
        self.bridge.stats()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            service_id: self.bridge.service_id().to_string(),
            enabled: self.is_enabled(),
            sequence: self.sequence_status(),
            enforcer: self.enforcer_stats(),
            bridge: self.bridge_stats(),
        }
    }
}
