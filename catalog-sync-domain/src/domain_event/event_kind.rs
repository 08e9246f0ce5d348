use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 事件种类标签，用于线上格式与本地分发表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    PreModify,
    PostModify,
    Removed,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Added,
        EventKind::PreModify,
        EventKind::PostModify,
        EventKind::Removed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "Added",
            EventKind::PreModify => "PreModify",
            EventKind::PostModify => "PostModify",
            EventKind::Removed => "Removed",
        }
    }

    /// PreModify 只在进程内传播，永远不会离开本节点
    pub fn is_process_local(&self) -> bool {
        matches!(self, EventKind::PreModify)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::parse(format!("unknown event kind: {s}")))
    }
}
