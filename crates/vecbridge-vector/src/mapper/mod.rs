//! 记录映射：在消费者记录与后端原生存储结构之间双向转换
//!
//! 记录先经 serde 转为 `serde_json::Value`，再按模式拆分为键、数据、向量。
//! 映射是纯函数，只依赖输入与缓存的模式。

mod hash;
mod json;
mod point;
mod search;

pub use hash::*;
pub use json::*;
pub use point::*;
pub use search::*;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use vecbridge_core::{Result, VecBridgeError};

/// 读取选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRecordOptions {
    pub include_vectors: bool,
}

impl GetRecordOptions {
    pub fn with_vectors() -> Self {
        Self {
            include_vectors: true,
        }
    }

    pub fn without_vectors() -> Self {
        Self {
            include_vectors: false,
        }
    }
}

impl Default for GetRecordOptions {
    fn default() -> Self {
        Self::with_vectors()
    }
}

pub trait RecordMapper<R>: Send + Sync {
    type Storage;

    fn to_storage(&self, record: &R) -> Result<Self::Storage>;

    fn from_storage(&self, storage: Self::Storage, options: &GetRecordOptions) -> Result<R>;
}

pub(crate) fn record_to_object<R: Serialize>(record: &R) -> Result<Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(VecBridgeError::Mapping(format!(
            "记录必须序列化为 JSON 对象，实际为 {}",
            json_kind(&other)
        ))),
        Err(e) => Err(VecBridgeError::Mapping(format!("记录序列化失败: {}", e))),
    }
}

pub(crate) fn object_to_record<R: DeserializeOwned>(object: Map<String, Value>) -> Result<R> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| VecBridgeError::Mapping(format!("记录反序列化失败: {}", e)))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn float_value(value: f64, property: &str) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| VecBridgeError::Mapping(format!("属性 '{}' 包含非有限浮点数", property)))
}

/// JSON 数组 → f64 元素
pub(crate) fn vector_elements(value: &Value, property: &str) -> Result<Vec<f64>> {
    let items = value.as_array().ok_or_else(|| {
        VecBridgeError::Mapping(format!(
            "向量属性 '{}' 必须是数组，实际为 {}",
            property,
            json_kind(value)
        ))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| {
                VecBridgeError::Mapping(format!("向量属性 '{}' 包含非数值元素", property))
            })
        })
        .collect()
}

pub(crate) fn f32_vector(value: &Value, property: &str) -> Result<Vec<f32>> {
    Ok(vector_elements(value, property)?
        .into_iter()
        .map(|x| x as f32)
        .collect())
}

pub(crate) fn vector_value<I>(elements: I, property: &str) -> Result<Value>
where
    I: IntoIterator<Item = f64>,
{
    elements
        .into_iter()
        .map(|x| float_value(x, property))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// 把字段从一个对象移到另一个对象，同时改名
pub(crate) fn move_field(
    from: &mut Map<String, Value>,
    from_name: &str,
    to: &mut Map<String, Value>,
    to_name: &str,
) {
    if let Some(value) = from.remove(from_name) {
        to.insert(to_name.to_string(), value);
    }
}
