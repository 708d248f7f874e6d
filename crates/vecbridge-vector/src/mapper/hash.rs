//! Redis Hash 映射
//!
//! 每个标量字段是一个文本条目；每个向量是一个条目，元素按小端 IEEE-754 连续打包。

use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use vecbridge_core::{Result, VecBridgeError};

use super::{
    GetRecordOptions, RecordMapper, float_value, json_kind, object_to_record, record_to_object,
    vector_elements, vector_value,
};
use crate::client::HashEntry;
use crate::schema::{DataProperty, DataType, RecordProperty, RecordSchema, VectorElementType, VectorProperty, VectorStoreRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct HashStorageRecord {
    pub key: String,
    pub entries: Vec<HashEntry>,
}

pub struct RedisHashRecordMapper<R> {
    schema: Arc<RecordSchema>,
    _record: PhantomData<fn() -> R>,
}

impl<R> RedisHashRecordMapper<R> {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            _record: PhantomData,
        }
    }
}

impl<R: VectorStoreRecord> RecordMapper<R> for RedisHashRecordMapper<R> {
    type Storage = HashStorageRecord;

    fn to_storage(&self, record: &R) -> Result<HashStorageRecord> {
        let mut object = record_to_object(record)?;
        let key_property = self.schema.key_property();

        let key = match object.remove(&key_property.name) {
            Some(Value::String(key)) => key,
            _ => {
                return Err(VecBridgeError::Mapping(format!(
                    "键属性 '{}' 缺失或不是字符串",
                    key_property.name
                )));
            }
        };

        let mut entries = Vec::with_capacity(self.schema.properties().len());
        for property in self.schema.properties() {
            match property {
                RecordProperty::Key(_) => {}
                RecordProperty::Data(p) => {
                    if let Some(value) = object.remove(&p.name)
                        && let Some(text) = encode_scalar(p, &value)?
                    {
                        entries.push(HashEntry::new(p.storage_name(), text));
                    }
                }
                RecordProperty::Vector(p) => {
                    if let Some(value) = object.remove(&p.name)
                        && !value.is_null()
                    {
                        entries.push(HashEntry::new(p.storage_name(), encode_vector(p, &value)?));
                    }
                }
            }
        }

        Ok(HashStorageRecord { key, entries })
    }

    fn from_storage(&self, storage: HashStorageRecord, options: &GetRecordOptions) -> Result<R> {
        let HashStorageRecord { key, entries } = storage;
        let mut fields: HashMap<String, Vec<u8>> = entries
            .into_iter()
            .map(|entry| (entry.field, entry.value))
            .collect();

        let key_property = self.schema.key_property();
        let mut object = Map::new();
        object.insert(key_property.name.clone(), Value::String(key));

        for property in self.schema.properties() {
            match property {
                RecordProperty::Key(_) => {}
                RecordProperty::Data(p) => {
                    if let Some(bytes) = fields.remove(p.storage_name()) {
                        object.insert(p.name.clone(), decode_scalar(p, &bytes)?);
                    }
                }
                RecordProperty::Vector(p) => {
                    if options.include_vectors
                        && let Some(bytes) = fields.remove(p.storage_name())
                    {
                        object.insert(p.name.clone(), decode_vector(p, &bytes)?);
                    }
                }
            }
        }

        object_to_record(object)
    }
}

/// `None` 表示字段为 null，不写入 Hash
fn encode_scalar(property: &DataProperty, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(VecBridgeError::Mapping(format!(
            "Hash 存储不支持属性 '{}' 的值类型 {}",
            property.name,
            json_kind(other)
        ))),
    }
}

fn decode_scalar(property: &DataProperty, bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        VecBridgeError::Mapping(format!("属性 '{}' 的值不是合法的 UTF-8", property.name))
    })?;
    let invalid = || {
        VecBridgeError::Mapping(format!(
            "属性 '{}' 的值 '{}' 无法解析为 {:?}",
            property.name, text, property.data_type
        ))
    };

    match &property.data_type {
        DataType::String => Ok(Value::String(text.to_string())),
        DataType::Bool => text.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
        DataType::Int32 | DataType::Int64 => {
            text.parse::<i64>().map(Value::from).map_err(|_| invalid())
        }
        DataType::Float32 | DataType::Float64 => {
            let number = text.parse::<f64>().map_err(|_| invalid())?;
            float_value(number, &property.name)
        }
        DataType::DateTime => DateTime::parse_from_rfc3339(text)
            .map(|_| Value::String(text.to_string()))
            .map_err(|_| invalid()),
        DataType::Guid => Uuid::parse_str(text)
            .map(|_| Value::String(text.to_string()))
            .map_err(|_| invalid()),
        DataType::Collection(_) => Err(VecBridgeError::Mapping(format!(
            "Hash 存储不支持集合属性 '{}'",
            property.name
        ))),
    }
}

fn element_type(property: &VectorProperty) -> Result<VectorElementType> {
    match property.element_type {
        Some(element_type @ (VectorElementType::Float32 | VectorElementType::Float64)) => {
            Ok(element_type)
        }
        other => Err(VecBridgeError::Mapping(format!(
            "向量属性 '{}' 的元素类型 {:?} 不受支持",
            property.name, other
        ))),
    }
}

fn encode_vector(property: &VectorProperty, value: &Value) -> Result<Vec<u8>> {
    let element_type = element_type(property)?;
    let elements = vector_elements(value, &property.name)?;

    let mut bytes = Vec::with_capacity(elements.len() * element_type.width());
    for element in elements {
        match element_type {
            VectorElementType::Float64 => bytes.extend_from_slice(&element.to_le_bytes()),
            _ => bytes.extend_from_slice(&(element as f32).to_le_bytes()),
        }
    }
    Ok(bytes)
}

fn decode_vector(property: &VectorProperty, bytes: &[u8]) -> Result<Value> {
    let element_type = element_type(property)?;
    let width = element_type.width();
    if bytes.len() % width != 0 {
        return Err(VecBridgeError::Mapping(format!(
            "向量属性 '{}' 的字节长度 {} 不是 {} 的整数倍",
            property.name,
            bytes.len(),
            width
        )));
    }

    let elements = bytes.chunks_exact(width).map(|chunk| match element_type {
        VectorElementType::Float64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        }
        _ => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            f32::from_le_bytes(raw) as f64
        }
    });
    vector_value(elements, &property.name)
}
