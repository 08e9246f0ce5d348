//! 目录/配置事件模型（domain_event）
//!
//! 定义四种生命周期事件（Added / PreModify / PostModify / Removed）的载荷、
//! 事件种类标签，以及按变更顺序排列的属性差量 `PropertyDiff`。
//! 修改类事件在构造时校验目标类型，非法目标直接返回 `InvalidArgument`。

mod event_kind;
mod info_event;
mod property_diff;

pub use event_kind::EventKind;
pub use info_event::{EventPayload, InfoEvent};
pub use property_diff::{PropertyChange, PropertyDiff};
