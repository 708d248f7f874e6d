//! RedisJSON 映射
//!
//! 键从文档中移除并作为存储键单独传递，文档中不会重复出现。

use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{GetRecordOptions, RecordMapper, json_kind, move_field, object_to_record, record_to_object};
use crate::schema::{RecordProperty, RecordSchema, VectorStoreRecord};

/// 键 + 去掉键之后的 JSON 文档
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStorageRecord {
    pub key: String,
    pub payload: Map<String, Value>,
}

pub struct RedisJsonRecordMapper<R> {
    schema: Arc<RecordSchema>,
    _record: PhantomData<fn() -> R>,
}

impl<R> RedisJsonRecordMapper<R> {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            _record: PhantomData,
        }
    }
}

impl<R: VectorStoreRecord> RecordMapper<R> for RedisJsonRecordMapper<R> {
    type Storage = JsonStorageRecord;

    fn to_storage(&self, record: &R) -> Result<JsonStorageRecord> {
        let mut object = record_to_object(record)?;
        let key_property = self.schema.key_property();

        let key = match object.remove(&key_property.name) {
            Some(Value::String(key)) => key,
            Some(other) => {
                return Err(VecBridgeError::Mapping(format!(
                    "键属性 '{}' 必须是字符串，实际为 {}",
                    key_property.name,
                    json_kind(&other)
                )));
            }
            None => {
                return Err(VecBridgeError::Mapping(format!(
                    "记录缺少键属性 '{}'",
                    key_property.name
                )));
            }
        };

        let mut payload = Map::new();
        for property in self.schema.properties() {
            if matches!(property, RecordProperty::Key(_)) {
                continue;
            }
            move_field(&mut object, property.name(), &mut payload, property.storage_name());
        }

        Ok(JsonStorageRecord { key, payload })
    }

    fn from_storage(&self, storage: JsonStorageRecord, options: &GetRecordOptions) -> Result<R> {
        let JsonStorageRecord { key, mut payload } = storage;
        let key_property = self.schema.key_property();

        if payload.contains_key(key_property.storage_name()) {
            return Err(VecBridgeError::Mapping(format!(
                "存储的文档 '{}' 中不应包含键字段 '{}'",
                key,
                key_property.storage_name()
            )));
        }

        let mut object = Map::new();
        object.insert(key_property.name.clone(), Value::String(key));

        for property in self.schema.properties() {
            match property {
                RecordProperty::Key(_) => {}
                RecordProperty::Data(p) => {
                    move_field(&mut payload, p.storage_name(), &mut object, &p.name);
                }
                RecordProperty::Vector(p) => {
                    if options.include_vectors {
                        move_field(&mut payload, p.storage_name(), &mut object, &p.name);
                    }
                }
            }
        }

        object_to_record(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaReader;
    use crate::test_support::{Hotel, hotel_definition, paradise_patch};
    use serde_json::json;

    fn mapper() -> RedisJsonRecordMapper<Hotel> {
        RedisJsonRecordMapper::new(Arc::new(SchemaReader::derive(&hotel_definition()).unwrap()))
    }

    #[test]
    fn test_key_is_removed_from_payload() {
        let storage = mapper().to_storage(&paradise_patch()).unwrap();
        assert_eq!(storage.key, "h1");
        assert!(!storage.payload.contains_key("hotel_id"));
        assert_eq!(storage.payload["hotel_name"], json!("Paradise Patch"));
        assert_eq!(storage.payload["parking_is_included"], json!(true));
        assert!(!storage.payload.contains_key("parking_included"));
    }

    #[test]
    fn test_payload_follows_declaration_order() {
        let storage = mapper().to_storage(&paradise_patch()).unwrap();
        let fields: Vec<&str> = storage.payload.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec![
                "hotel_name",
                "rating",
                "parking_is_included",
                "description",
                "last_renovated",
                "description_embedding",
            ]
        );
    }

    #[test]
    fn test_roundtrip_with_vectors() {
        let mapper = mapper();
        let hotel = paradise_patch();
        let storage = mapper.to_storage(&hotel).unwrap();
        let restored = mapper.from_storage(storage, &GetRecordOptions::with_vectors()).unwrap();
        assert_eq!(restored, hotel);
    }

    #[test]
    fn test_read_without_vectors() {
        let mapper = mapper();
        let hotel = paradise_patch();
        let storage = mapper.to_storage(&hotel).unwrap();
        let restored = mapper.from_storage(storage, &GetRecordOptions::without_vectors()).unwrap();
        assert_eq!(restored.description_embedding, None);
        assert_eq!(restored.hotel_name, hotel.hotel_name);
        assert_eq!(restored.rating, hotel.rating);
        assert_eq!(restored.last_renovated, hotel.last_renovated);
    }

    #[test]
    fn test_payload_with_key_field_is_rejected() {
        let mapper = mapper();
        let mut storage = mapper.to_storage(&paradise_patch()).unwrap();
        storage.payload.insert("hotel_id".to_string(), json!("h1"));
        let err = mapper.from_storage(storage, &GetRecordOptions::default()).unwrap_err();
        assert!(matches!(err, VecBridgeError::Mapping(_)));
    }

    #[test]
    fn test_absent_and_null_optional_fields() {
        let mapper = mapper();
        let mut hotel = paradise_patch();
        hotel.rating = None;
        let storage = mapper.to_storage(&hotel).unwrap();
        assert_eq!(storage.payload["rating"], Value::Null);

        let restored = mapper.from_storage(storage, &GetRecordOptions::default()).unwrap();
        assert_eq!(restored.rating, None);
    }
}
