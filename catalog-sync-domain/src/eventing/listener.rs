//! 本地事件监听器（EventListener）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅种类、分发顺序）。
//!
use crate::domain_event::{EventKind, InfoEvent};
use crate::error::DomainResult;
use async_trait::async_trait;

#[derive(Clone, Debug)]
pub enum HandledEventKind {
    One(EventKind),
    Many(Vec<EventKind>),
    All,
}

impl HandledEventKind {
    pub fn includes(&self, kind: EventKind) -> bool {
        match self {
            HandledEventKind::One(k) => *k == kind,
            HandledEventKind::Many(ks) => ks.contains(&kind),
            HandledEventKind::All => true,
        }
    }
}

/// 监听器：处理进程内通道上分发的事件（本地触发或由桥接器转入的远端事件）
#[async_trait]
pub trait EventListener: Send + Sync {
    /// 监听器名称（用于诊断日志）
    fn listener_name(&self) -> &str;
    /// 返回该监听器订阅的事件种类
    fn handled_event_kind(&self) -> HandledEventKind;
    /// 分发顺序，数值小的先执行；相同顺序按注册先后
    fn order(&self) -> i32 {
        0
    }
    /// 处理事件
    async fn handle(&self, event: &InfoEvent) -> DomainResult<()>;
}

type ListenerFn = Box<dyn Fn(&InfoEvent) -> DomainResult<()> + Send + Sync>;

/// 以闭包形式注册的监听器
pub(crate) struct FnListener {
    name: String,
    kinds: HandledEventKind,
    order: i32,
    f: ListenerFn,
}

impl FnListener {
    pub(crate) fn new<F>(name: String, kinds: HandledEventKind, order: i32, f: F) -> Self
    where
        F: Fn(&InfoEvent) -> DomainResult<()> + Send + Sync + 'static,
    {
        Self {
            name,
            kinds,
            order,
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl EventListener for FnListener {
    fn listener_name(&self) -> &str {
        &self.name
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        self.kinds.clone()
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn handle(&self, event: &InfoEvent) -> DomainResult<()> {
        (self.f)(event)
    }
}
