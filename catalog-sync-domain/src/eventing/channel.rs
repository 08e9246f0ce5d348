//! 进程内事件通道（LocalEventChannel）
//!
//! 显式分发表：每种 `EventKind` 对应一个按 `order()` 稳定排序的监听器列表，
//! 发布时按事件种类 `match` 选取列表并依次同步调用。
//! 某个监听器失败不会阻止其后的监听器执行，全部执行完后返回第一个错误；
//! 总线错误优先于其他错误返回，调用方据此区分广播失败。
//!
use super::listener::{EventListener, FnListener, HandledEventKind};
use crate::domain_event::{EventKind, InfoEvent};
use crate::error::{DomainError, DomainResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

type Listeners = Vec<Arc<dyn EventListener>>;

#[derive(Default)]
struct DispatchTable {
    added: Listeners,
    pre_modify: Listeners,
    post_modify: Listeners,
    removed: Listeners,
}

impl DispatchTable {
    fn slot(&self, kind: EventKind) -> &Listeners {
        match kind {
            EventKind::Added => &self.added,
            EventKind::PreModify => &self.pre_modify,
            EventKind::PostModify => &self.post_modify,
            EventKind::Removed => &self.removed,
        }
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut Listeners {
        match kind {
            EventKind::Added => &mut self.added,
            EventKind::PreModify => &mut self.pre_modify,
            EventKind::PostModify => &mut self.post_modify,
            EventKind::Removed => &mut self.removed,
        }
    }

    fn insert(&mut self, listener: Arc<dyn EventListener>) {
        let handled = listener.handled_event_kind();
        for kind in EventKind::ALL {
            if handled.includes(kind) {
                let slot = self.slot_mut(kind);
                slot.push(listener.clone());
                slot.sort_by_key(|l| l.order());
            }
        }
    }
}

#[derive(Default)]
pub struct LocalEventChannel {
    table: RwLock<DispatchTable>,
}

impl LocalEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器
    pub fn register(&self, listener: Arc<dyn EventListener>) {
        self.table.write().insert(listener);
    }

    /// 以闭包注册监听器
    pub fn register_fn<F>(&self, name: impl Into<String>, kinds: HandledEventKind, order: i32, f: F)
    where
        F: Fn(&InfoEvent) -> DomainResult<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnListener::new(name.into(), kinds, order, f)));
    }

    /// 某种事件的监听器名称，按分发顺序排列
    pub fn listener_names(&self, kind: EventKind) -> Vec<String> {
        self.table
            .read()
            .slot(kind)
            .iter()
            .map(|l| l.listener_name().to_string())
            .collect()
    }

    /// 同步分发事件到匹配的监听器
    pub async fn publish(&self, event: &InfoEvent) -> DomainResult<()> {
        let listeners = self.table.read().slot(event.kind()).clone();

        let mut first_error = None;
        for listener in listeners {
            if let Err(err) = listener.handle(event).await {
                debug!(
                    listener = listener.listener_name(),
                    event_id = event.event_id(),
                    kind = %event.kind(),
                    error = %err,
                    "event listener failed"
                );
                let replace = match &first_error {
                    None => true,
                    Some(DomainError::EventBus { .. }) => false,
                    Some(_) => matches!(err, DomainError::EventBus { .. }),
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
