//! 线上格式（wire）
//!
//! - `Destination`：广播（`**`）或指定服务；
//! - `RemoteEnvelope`：附带来源服务与目标地址的事件信封；
//! - `SerializedEnvelope`：扁平化的线上形态及与 `RemoteEnvelope` 间的转换。
//!
//! 编解码使用 JSON，传输层只搬运 `SerializedEnvelope`。

mod destination;
mod remote_envelope;
mod serialized_envelope;

pub use destination::{BROADCAST_DESTINATION, Destination};
pub use remote_envelope::RemoteEnvelope;
pub use serialized_envelope::SerializedEnvelope;
