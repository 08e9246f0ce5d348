//! 实体标识与对象快照（entity）
//!
//! 不包含目录对象模型本身，仅定义同步所需的最小部分：
//! - `EntityType` / `EntityCategory`：类型标签与类别判定；
//! - `EntityRef`：`(id, type)` 轻量引用，配置单例使用固定标识；
//! - `CatalogInfo` / `InfoSnapshot`：本地对象接口与可传输的属性快照；
//! - `PropertyValue` / `Reference`：属性值与“未解析/已解析”引用。

mod entity_ref;
mod entity_type;
mod info;
mod value;

pub use entity_ref::EntityRef;
pub use entity_type::{EntityCategory, EntityType};
pub use info::{CatalogInfo, InfoSnapshot};
pub use value::{PropertyValue, Reference};
