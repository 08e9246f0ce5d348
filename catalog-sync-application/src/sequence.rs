//! 全局配置更新序号跟踪
//!
//! `global`：任意事件上观察到的最大序号；`local`：本地最近一次应用的全局配置序号。
//! 远端针对全局配置的 PostModify 若序号小于 `local`，视为过期。
//!
use async_trait::async_trait;
use catalog_sync_domain::domain_event::{EventKind, InfoEvent};
use catalog_sync_domain::entity::EntityType;
use catalog_sync_domain::error::DomainResult;
use catalog_sync_domain::eventing::{EventListener, HandledEventKind};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// 分发顺序：最先观察序号
pub const SEQUENCE_TRACKER_ORDER: i32 = -200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceStatus {
    pub local: i64,
    pub global: i64,
    pub lag: i64,
}

#[derive(Debug, Default)]
pub struct UpdateSequenceTracker {
    local: AtomicI64,
    global: AtomicI64,
}

impl UpdateSequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, sequence: i64) {
        self.global.fetch_max(sequence, Ordering::AcqRel);
    }

    /// 本地应用了某个序号的全局配置
    pub fn applied(&self, sequence: i64) {
        self.local.fetch_max(sequence, Ordering::AcqRel);
        self.observe(sequence);
    }

    pub fn local(&self) -> i64 {
        self.local.load(Ordering::Acquire)
    }

    pub fn global(&self) -> i64 {
        self.global.load(Ordering::Acquire)
    }

    pub fn is_stale(&self, event: &InfoEvent) -> bool {
        match Self::global_config_sequence(event) {
            Some(sequence) => event.is_remote() && sequence < self.local(),
            None => false,
        }
    }

    pub fn status(&self) -> SequenceStatus {
        let local = self.local();
        let global = self.global();
        SequenceStatus {
            local,
            global,
            lag: (global - local).max(0),
        }
    }

    /// 针对全局配置的 PostModify 携带的序号
    pub(crate) fn global_config_sequence(event: &InfoEvent) -> Option<i64> {
        if event.kind() == EventKind::PostModify
            && event.target().entity_type() == EntityType::GeoServer
        {
            event.update_sequence()
        } else {
            None
        }
    }
}

#[async_trait]
impl EventListener for UpdateSequenceTracker {
    fn listener_name(&self) -> &str {
        "update-sequence-tracker"
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        HandledEventKind::All
    }

    fn order(&self) -> i32 {
        SEQUENCE_TRACKER_ORDER
    }

    async fn handle(&self, event: &InfoEvent) -> DomainResult<()> {
        let Some(sequence) = event.update_sequence() else {
            return Ok(());
        };
        match Self::global_config_sequence(event) {
            // 本地修改已经生效，远端修改由一致性保证器应用后再记录
            Some(sequence) if event.is_local() => self.applied(sequence),
            _ => self.observe(sequence),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_sync_domain::domain_event::PropertyDiff;
    use catalog_sync_domain::entity::EntityRef;

    fn global_modify(sequence: i64) -> InfoEvent {
        let diff = PropertyDiff::new().with("verbose", Some(false.into()), Some(true.into()));
        InfoEvent::post_modify("node-a", EntityRef::global(), diff)
            .unwrap()
            .with_update_sequence(sequence)
    }

    #[tokio::test]
    async fn local_modifications_advance_both_sequences() {
        let tracker = UpdateSequenceTracker::new();
        tracker.handle(&global_modify(4)).await.unwrap();
        assert_eq!(
            tracker.status(),
            SequenceStatus {
                local: 4,
                global: 4,
                lag: 0
            }
        );
    }

    #[tokio::test]
    async fn remote_events_only_advance_global() {
        let tracker = UpdateSequenceTracker::new();
        tracker.applied(3);
        tracker.handle(&global_modify(7).into_remote()).await.unwrap();
        assert_eq!(tracker.status().lag, 4);
    }

    #[test]
    fn older_remote_global_modifications_are_stale() {
        let tracker = UpdateSequenceTracker::new();
        tracker.applied(5);
        assert!(tracker.is_stale(&global_modify(4).into_remote()));
        assert!(!tracker.is_stale(&global_modify(5).into_remote()));
        assert!(!tracker.is_stale(&global_modify(4)));
    }
}
