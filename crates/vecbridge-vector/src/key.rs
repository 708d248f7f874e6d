//! 记录键类型与键前缀

use serde_json::Value;
use std::fmt::Debug;
use uuid::Uuid;

use vecbridge_core::{Result, VecBridgeError};

use crate::schema::KeyType;

/// 集合可使用的 Rust 键类型
pub trait RecordKey: Clone + Debug + Send + Sync + 'static {
    const KEY_TYPE: KeyType;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self>;
}

impl RecordKey for String {
    const KEY_TYPE: KeyType = KeyType::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| VecBridgeError::Mapping(format!("键必须是字符串，实际为 {}", value)))
    }
}

impl RecordKey for u64 {
    const KEY_TYPE: KeyType = KeyType::UInt64;

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_u64()
            .ok_or_else(|| VecBridgeError::Mapping(format!("键必须是无符号整数，实际为 {}", value)))
    }
}

impl RecordKey for Uuid {
    const KEY_TYPE: KeyType = KeyType::Guid;

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| VecBridgeError::Mapping(format!("键必须是 UUID，实际为 {}", value)))
    }
}

/// 把集合名嵌入物理键，使多个逻辑集合共享同一命名空间
#[derive(Debug, Clone)]
pub struct KeyPrefixer {
    prefix: Option<String>,
}

impl KeyPrefixer {
    pub fn new(collection_name: &str, enabled: bool) -> Self {
        Self {
            prefix: enabled.then(|| format!("{}:", collection_name)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prefix.is_some()
    }

    /// 索引创建时使用的前缀
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn to_storage_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }

    pub fn from_storage_key<'a>(&self, storage_key: &'a str) -> Result<&'a str> {
        match &self.prefix {
            Some(prefix) => storage_key.strip_prefix(prefix.as_str()).ok_or_else(|| {
                VecBridgeError::Mapping(format!(
                    "物理键 '{}' 缺少前缀 '{}'",
                    storage_key, prefix
                ))
            }),
            None => Ok(storage_key),
        }
    }
}
