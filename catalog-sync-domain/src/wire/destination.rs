use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 广播目标在线上的写法
pub const BROADCAST_DESTINATION: &str = "**";

/// 消息的目标服务：全部服务（广播）或指定服务
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    #[default]
    AllServices,
    Service(String),
}

impl Destination {
    pub fn parse(raw: &str) -> Self {
        if raw == BROADCAST_DESTINATION {
            Destination::AllServices
        } else {
            Destination::Service(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Destination::AllServices => BROADCAST_DESTINATION,
            Destination::Service(name) => name,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Destination::AllServices)
    }

    /// 目标是否包含给定服务
    pub fn accepts(&self, service_id: &str) -> bool {
        match self {
            Destination::AllServices => true,
            Destination::Service(name) => name == service_id,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Destination::parse(&raw))
    }
}
