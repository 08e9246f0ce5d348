//! 最终一致性保证（ConsistencyEnforcer）
//!
//! 远端事件引用的对象尚未到达本地时，事件以待处理操作的形式按每个缺失引用建立索引；
//! 之后任何引入新对象的事件（本地或远端）都会取出以该对象为键的待处理操作重新解析，
//! 缺失集合清空即应用，否则按缩小后的缺失集合重新索引。
//!
//! 同一个键上就绪的操作按入队先后（FIFO）应用。
//! 超过重试次数或存活时间的操作被丢弃，每个丢弃恰好产生一条 warn 日志。
//!
//! 索引的所有读写都在同一把互斥锁下进行；应用到本地目录在锁外执行。
//!
use crate::resolver::ReferenceResolver;
use crate::sequence::UpdateSequenceTracker;
use async_trait::async_trait;
use catalog_sync_domain::catalog::RemoteEventApplier;
use catalog_sync_domain::domain_event::{EventKind, EventPayload, InfoEvent};
use catalog_sync_domain::entity::EntityRef;
use catalog_sync_domain::error::DomainResult;
use catalog_sync_domain::eventing::{EventListener, HandledEventKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 分发顺序：在缓存清理之后、出站桥接之前
pub const ENFORCER_ORDER: i32 = 0;

/// 提交一个远端事件的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    Queued,
    /// 过期的全局配置修改
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    TooManyAttempts,
    TooOld,
}

impl DropReason {
    fn as_str(&self) -> &'static str {
        match self {
            DropReason::TooManyAttempts => "max attempts exceeded",
            DropReason::TooOld => "max age exceeded",
        }
    }
}

#[derive(Debug, Clone)]
struct PendingOperation {
    event: InfoEvent,
    missing_refs: BTreeSet<EntityRef>,
    enqueued_at: DateTime<Utc>,
    attempts: u32,
}

impl PendingOperation {
    fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        (now - self.enqueued_at)
            .to_std()
            .map(|age| age > max_age)
            .unwrap_or(false)
    }
}

/// 待处理操作与其缺失引用索引
///
/// 操作以单调递增的入队序号为键，序号即 FIFO 顺序；重新索引时保留原序号。
#[derive(Default)]
struct PendingIndex {
    next_seq: u64,
    operations: BTreeMap<u64, PendingOperation>,
    by_ref: HashMap<EntityRef, BTreeSet<u64>>,
}

impl PendingIndex {
    fn enqueue(&mut self, operation: PendingOperation) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert(seq, operation);
    }

    fn insert(&mut self, seq: u64, operation: PendingOperation) {
        for missing in &operation.missing_refs {
            self.by_ref.entry(missing.clone()).or_default().insert(seq);
        }
        self.operations.insert(seq, operation);
    }

    /// 从所有索引键上移除
    fn remove(&mut self, seq: u64) -> Option<PendingOperation> {
        let operation = self.operations.remove(&seq)?;
        for missing in &operation.missing_refs {
            if let Some(seqs) = self.by_ref.get_mut(missing) {
                seqs.remove(&seq);
                if seqs.is_empty() {
                    self.by_ref.remove(missing);
                }
            }
        }
        Some(operation)
    }

    /// 取出以 `key` 为索引的全部操作，按入队顺序排列
    fn take_keyed(&mut self, key: &EntityRef) -> Vec<(u64, PendingOperation)> {
        let Some(seqs) = self.by_ref.remove(key) else {
            return Vec::new();
        };
        seqs.into_iter()
            .filter_map(|seq| self.remove(seq).map(|op| (seq, op)))
            .collect()
    }

    fn expired(&mut self, max_age: Duration, now: DateTime<Utc>) -> Vec<PendingOperation> {
        let seqs: Vec<u64> = self
            .operations
            .iter()
            .filter(|(_, op)| op.is_older_than(max_age, now))
            .map(|(seq, _)| *seq)
            .collect();
        seqs.into_iter().filter_map(|seq| self.remove(seq)).collect()
    }

    fn len(&self) -> usize {
        self.operations.len()
    }

    fn keyed(&self, key: &EntityRef) -> usize {
        self.by_ref.get(key).map_or(0, BTreeSet::len)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnforcerStats {
    pub pending: usize,
    pub applied: u64,
    pub queued: u64,
    pub replayed: u64,
    pub dropped: u64,
    pub stale_discarded: u64,
    pub apply_failed: u64,
}

#[derive(Default)]
struct Counters {
    applied: AtomicU64,
    queued: AtomicU64,
    replayed: AtomicU64,
    dropped: AtomicU64,
    stale_discarded: AtomicU64,
    apply_failed: AtomicU64,
}

pub struct ConsistencyEnforcer {
    resolver: ReferenceResolver,
    applier: Arc<dyn RemoteEventApplier>,
    sequences: Arc<UpdateSequenceTracker>,
    max_attempts: u32,
    max_age: Duration,
    pending: Mutex<PendingIndex>,
    counters: Counters,
}

impl ConsistencyEnforcer {
    pub fn new(
        resolver: ReferenceResolver,
        applier: Arc<dyn RemoteEventApplier>,
        sequences: Arc<UpdateSequenceTracker>,
        max_attempts: u32,
        max_age: Duration,
    ) -> Self {
        Self {
            resolver,
            applier,
            sequences,
            max_attempts,
            max_age,
            pending: Mutex::new(PendingIndex::default()),
            counters: Counters::default(),
        }
    }

    /// 提交远端事件：过期则丢弃，依赖缺失则排队，否则立即应用并重放因它就绪的操作
    pub async fn submit(&self, event: &InfoEvent) -> DomainResult<Disposition> {
        if self.discard_if_stale(event) {
            return Ok(Disposition::Discarded);
        }

        let mut event = event.clone();
        {
            let mut pending = self.pending.lock();
            // 在锁内解析，避免依赖恰好在解析与入队之间到达
            let missing = self.resolver.resolve_in_place(&mut event);
            if !missing.is_empty() {
                let target = event.target();
                debug!(
                    event_id = event.event_id(),
                    object_type = %target.entity_type(),
                    object_id = target.id(),
                    missing = ?missing,
                    "queueing event until its dependencies arrive"
                );
                pending.enqueue(PendingOperation {
                    event,
                    missing_refs: missing,
                    enqueued_at: Utc::now(),
                    attempts: 0,
                });
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                let expired = pending.expired(self.max_age, Utc::now());
                drop(pending);
                self.report_dropped(expired, DropReason::TooOld);
                return Ok(Disposition::Queued);
            }
        }

        self.apply(&event).await?;
        self.counters.applied.fetch_add(1, Ordering::Relaxed);
        self.drain(introduced_entity(&event)).await;
        Ok(Disposition::Applied)
    }

    /// 某个对象已在本地可用（本地新增或远端应用），重放等待它的操作
    pub async fn entity_available(&self, entity_ref: &EntityRef) {
        self.drain(Some(entity_ref.clone())).await;
    }

    /// 清理超过存活时间的操作，返回丢弃数
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let expired = self.pending.lock().expired(self.max_age, now);
        let dropped = expired.len();
        self.report_dropped(expired, DropReason::TooOld);
        dropped
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// 等待某个对象的操作数
    pub fn pending_on(&self, entity_ref: &EntityRef) -> usize {
        self.pending.lock().keyed(entity_ref)
    }

    pub fn stats(&self) -> EnforcerStats {
        EnforcerStats {
            pending: self.pending_len(),
            applied: self.counters.applied.load(Ordering::Relaxed),
            queued: self.counters.queued.load(Ordering::Relaxed),
            replayed: self.counters.replayed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            stale_discarded: self.counters.stale_discarded.load(Ordering::Relaxed),
            apply_failed: self.counters.apply_failed.load(Ordering::Relaxed),
        }
    }

    /// 排队期间本地可能已应用了更新的全局配置，重放前也要检查
    fn discard_if_stale(&self, event: &InfoEvent) -> bool {
        if !self.sequences.is_stale(event) {
            return false;
        }
        self.counters.stale_discarded.fetch_add(1, Ordering::Relaxed);
        debug!(
            event_id = event.event_id(),
            origin = event.origin(),
            update_sequence = event.update_sequence(),
            local_sequence = self.sequences.local(),
            "discarding stale global configuration update"
        );
        true
    }

    async fn apply(&self, event: &InfoEvent) -> DomainResult<()> {
        self.applier.apply(event).await?;
        if let Some(sequence) = UpdateSequenceTracker::global_config_sequence(event) {
            self.sequences.applied(sequence);
        }
        Ok(())
    }

    /// 逐个处理新可用的对象；重放的操作若又引入新对象，继续处理
    async fn drain(&self, first: Option<EntityRef>) {
        let mut worklist: VecDeque<EntityRef> = first.into_iter().collect();

        while let Some(key) = worklist.pop_front() {
            let (ready, exhausted) = self.take_ready(&key);
            self.report_dropped(exhausted, DropReason::TooManyAttempts);

            for event in ready {
                if self.discard_if_stale(&event) {
                    continue;
                }
                let target = event.target();
                info!(
                    event_id = event.event_id(),
                    object_type = %target.entity_type(),
                    object_id = target.id(),
                    dependency = %key,
                    "replaying pending event"
                );
                match self.apply(&event).await {
                    Ok(()) => {
                        self.counters.replayed.fetch_add(1, Ordering::Relaxed);
                        worklist.extend(introduced_entity(&event));
                    }
                    Err(err) => {
                        self.counters.apply_failed.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            event_id = event.event_id(),
                            origin = event.origin(),
                            object_type = %target.entity_type(),
                            object_id = target.id(),
                            error = %err,
                            "failed to apply replayed event"
                        );
                    }
                }
            }
        }
    }

    /// 取出以 `key` 为索引的操作并重新解析：就绪的按 FIFO 返回，
    /// 仍有缺失的累加尝试次数后重新索引，超过上限的返回待丢弃
    fn take_ready(&self, key: &EntityRef) -> (Vec<InfoEvent>, Vec<PendingOperation>) {
        let mut pending = self.pending.lock();
        let mut ready = Vec::new();
        let mut exhausted = Vec::new();

        for (seq, mut operation) in pending.take_keyed(key) {
            let missing = self.resolver.resolve_in_place(&mut operation.event);
            if missing.is_empty() {
                ready.push(operation.event);
                continue;
            }

            operation.missing_refs = missing;
            operation.attempts += 1;
            if operation.attempts >= self.max_attempts {
                exhausted.push(operation);
            } else {
                pending.insert(seq, operation);
            }
        }

        (ready, exhausted)
    }

    fn report_dropped(&self, operations: Vec<PendingOperation>, reason: DropReason) {
        for operation in operations {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            let target = operation.event.target();
            warn!(
                event_id = operation.event.event_id(),
                origin = operation.event.origin(),
                object_type = %target.entity_type(),
                object_id = target.id(),
                missing = ?operation.missing_refs,
                attempts = operation.attempts,
                enqueued_at = %operation.enqueued_at,
                reason = reason.as_str(),
                "dropping pending event, local catalog is now inconsistent"
            );
        }
    }
}

/// 事件应用后新出现在本地的对象
fn introduced_entity(event: &InfoEvent) -> Option<EntityRef> {
    match event.payload() {
        EventPayload::Added { .. }
        | EventPayload::PostModify {
            replacement: Some(_),
            ..
        } => Some(event.target()),
        _ => None,
    }
}

#[async_trait]
impl EventListener for ConsistencyEnforcer {
    fn listener_name(&self) -> &str {
        "consistency-enforcer"
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        HandledEventKind::Many(vec![
            EventKind::Added,
            EventKind::PostModify,
            EventKind::Removed,
        ])
    }

    fn order(&self) -> i32 {
        ENFORCER_ORDER
    }

    async fn handle(&self, event: &InfoEvent) -> DomainResult<()> {
        if event.is_remote() {
            self.submit(event).await?;
        } else if let Some(entity_ref) = introduced_entity(event) {
            self.entity_available(&entity_ref).await;
        }
        Ok(())
    }
}
