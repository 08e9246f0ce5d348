//! 领域层统一错误定义
//!
//! 聚焦序列化、事件构造校验、集群总线、本地监听器与目录应用等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/解析 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 事件构造 ---
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // --- 事件系统 ---
    #[error("event bus error: {reason}")]
    EventBus { reason: String },
    #[error("event bus lagged: {skipped} messages lost")]
    Lagged { skipped: u64 },
    #[error("event listener error: listener={listener}, reason={reason}")]
    EventListener { listener: String, reason: String },

    // --- 目录 ---
    #[error("apply failed: object={object}, reason={reason}")]
    Apply { object: String, reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
}

impl DomainError {
    pub fn parse(reason: impl Into<String>) -> Self {
        DomainError::Parse {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        DomainError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn event_bus(reason: impl Into<String>) -> Self {
        DomainError::EventBus {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
