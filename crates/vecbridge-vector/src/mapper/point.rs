//! Qdrant 点结构映射
//!
//! 键成为点 ID，数据字段成为 payload。集合使用命名向量时每个向量按存储名保存，
//! 否则集合只有一个无名向量槽。

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use vecbridge_core::{Result, VecBridgeError};

use super::{
    GetRecordOptions, RecordMapper, f32_vector, json_kind, move_field, object_to_record,
    record_to_object, vector_value,
};
use crate::client::{PointId, PointStruct, PointVectors};
use crate::schema::{KeyType, RecordProperty, RecordSchema, VectorStoreRecord};

pub struct QdrantRecordMapper<R> {
    schema: Arc<RecordSchema>,
    has_named_vectors: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R> QdrantRecordMapper<R> {
    pub fn new(schema: Arc<RecordSchema>, has_named_vectors: bool) -> Result<Self> {
        if !has_named_vectors && schema.vector_properties().len() != 1 {
            return Err(VecBridgeError::Config(format!(
                "未启用命名向量时只能有一个向量属性，实际有 {} 个",
                schema.vector_properties().len()
            )));
        }
        Ok(Self {
            schema,
            has_named_vectors,
            _record: PhantomData,
        })
    }
}

/// 把记录中的键值转换为点 ID
pub(crate) fn point_id_from_value(key_type: KeyType, value: &Value) -> Result<PointId> {
    match (key_type, value) {
        (KeyType::UInt64, Value::Number(n)) => n.as_u64().map(PointId::Num).ok_or_else(|| {
            VecBridgeError::Mapping(format!("点 ID 必须是无符号整数，实际为 {}", n))
        }),
        (KeyType::Guid, Value::String(s)) => Uuid::parse_str(s)
            .map(PointId::Uuid)
            .map_err(|_| VecBridgeError::Mapping(format!("点 ID 必须是 UUID，实际为 '{}'", s))),
        (key_type, other) => Err(VecBridgeError::Mapping(format!(
            "键类型 {:?} 与键值类型 {} 不匹配",
            key_type,
            json_kind(other)
        ))),
    }
}

pub(crate) fn point_id_to_value(id: &PointId) -> Value {
    match id {
        PointId::Num(n) => Value::from(*n),
        PointId::Uuid(u) => Value::String(u.to_string()),
    }
}

impl<R: VectorStoreRecord> RecordMapper<R> for QdrantRecordMapper<R> {
    type Storage = PointStruct;

    fn to_storage(&self, record: &R) -> Result<PointStruct> {
        let mut object = record_to_object(record)?;
        let key_property = self.schema.key_property();

        let key = object.remove(&key_property.name).ok_or_else(|| {
            VecBridgeError::Mapping(format!("记录缺少键属性 '{}'", key_property.name))
        })?;
        let id = point_id_from_value(key_property.key_type, &key)?;

        let mut payload = Map::new();
        let mut named = BTreeMap::new();
        let mut unnamed = None;

        for property in self.schema.properties() {
            match property {
                RecordProperty::Key(_) => {}
                RecordProperty::Data(p) => {
                    move_field(&mut object, &p.name, &mut payload, p.storage_name());
                }
                RecordProperty::Vector(p) => {
                    let Some(value) = object.remove(&p.name).filter(|v| !v.is_null()) else {
                        continue;
                    };
                    let vector = f32_vector(&value, &p.name)?;
                    if self.has_named_vectors {
                        named.insert(p.storage_name().to_string(), vector);
                    } else {
                        unnamed = Some(vector);
                    }
                }
            }
        }

        let vectors = if self.has_named_vectors {
            (!named.is_empty()).then_some(PointVectors::Named(named))
        } else {
            unnamed.map(PointVectors::Unnamed)
        };

        Ok(PointStruct {
            id,
            vectors,
            payload,
        })
    }

    fn from_storage(&self, storage: PointStruct, options: &GetRecordOptions) -> Result<R> {
        let PointStruct {
            id,
            vectors,
            mut payload,
        } = storage;

        let mut object = Map::new();
        object.insert(self.schema.key_property().name.clone(), point_id_to_value(&id));

        for property in self.schema.data_properties() {
            move_field(&mut payload, property.storage_name(), &mut object, &property.name);
        }

        if options.include_vectors {
            match (vectors, self.has_named_vectors) {
                (None, _) => {}
                (Some(PointVectors::Named(mut named)), true) => {
                    for property in self.schema.vector_properties() {
                        if let Some(vector) = named.remove(property.storage_name()) {
                            let value = vector_value(vector.into_iter().map(f64::from), &property.name)?;
                            object.insert(property.name.clone(), value);
                        }
                    }
                }
                (Some(PointVectors::Unnamed(vector)), false) => {
                    let property = &self.schema.vector_properties()[0];
                    let value = vector_value(vector.into_iter().map(f64::from), &property.name)?;
                    object.insert(property.name.clone(), value);
                }
                (Some(_), named) => {
                    return Err(VecBridgeError::Mapping(format!(
                        "点 {} 的向量格式与集合配置不符 (has_named_vectors = {})",
                        id, named
                    )));
                }
            }
        }

        object_to_record(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        DataProperty, DataType, KeyProperty, RecordDefinition, SchemaReader, VectorProperty,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        id: u64,
        title: String,
        tags: Vec<String>,
        #[serde(default)]
        title_embedding: Option<Vec<f32>>,
        #[serde(default)]
        body_embedding: Option<Vec<f32>>,
    }

    impl VectorStoreRecord for Article {
        fn record_definition() -> RecordDefinition {
            RecordDefinition::new()
                .key(KeyProperty::new("id", KeyType::UInt64))
                .data(DataProperty::new("title", DataType::String).filterable())
                .data(DataProperty::new("tags", DataType::collection_of(DataType::String)))
                .vector(VectorProperty::new("title_embedding", 3).with_storage_name("title"))
                .vector(VectorProperty::new("body_embedding", 3))
        }
    }

    fn article() -> Article {
        Article {
            id: 42,
            title: "Rust".to_string(),
            tags: vec!["lang".to_string()],
            title_embedding: Some(vec![0.5, 0.25, 0.125]),
            body_embedding: Some(vec![1.0, 2.0, 3.0]),
        }
    }

    #[test]
    fn test_storage_name_collision_with_title_is_rejected() {
        // "title" 既是数据字段名又是向量存储名
        assert!(SchemaReader::derive(&Article::record_definition()).is_err());
    }

    fn named_schema() -> Arc<RecordSchema> {
        let mut definition = Article::record_definition();
        if let Some(RecordProperty::Vector(p)) = definition.properties.get_mut(3) {
            p.storage_name = Some("title_vec".to_string());
        }
        Arc::new(SchemaReader::derive(&definition).unwrap())
    }

    #[test]
    fn test_named_vectors_roundtrip() {
        let mapper = QdrantRecordMapper::<Article>::new(named_schema(), true).unwrap();
        let point = mapper.to_storage(&article()).unwrap();
        assert_eq!(point.id, PointId::Num(42));
        assert_eq!(point.payload["tags"], json!(["lang"]));
        match &point.vectors {
            Some(PointVectors::Named(named)) => {
                assert_eq!(named["title_vec"], vec![0.5, 0.25, 0.125]);
                assert_eq!(named["body_embedding"], vec![1.0, 2.0, 3.0]);
            }
            other => panic!("unexpected vectors: {:?}", other),
        }

        let restored = mapper.from_storage(point, &GetRecordOptions::default()).unwrap();
        assert_eq!(restored, article());
    }

    #[test]
    fn test_without_vectors() {
        let mapper = QdrantRecordMapper::<Article>::new(named_schema(), true).unwrap();
        let point = mapper.to_storage(&article()).unwrap();
        let restored = mapper
            .from_storage(point, &GetRecordOptions::without_vectors())
            .unwrap();
        assert_eq!(restored.title_embedding, None);
        assert_eq!(restored.body_embedding, None);
        assert_eq!(restored.title, "Rust");
    }

    #[test]
    fn test_unnamed_requires_single_vector() {
        let err = QdrantRecordMapper::<Article>::new(named_schema(), false)
            .err()
            .unwrap();
        assert!(matches!(err, VecBridgeError::Config(_)));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Memo {
        id: Uuid,
        text: String,
        #[serde(default)]
        embedding: Option<Vec<f32>>,
    }

    impl VectorStoreRecord for Memo {
        fn record_definition() -> RecordDefinition {
            RecordDefinition::new()
                .key(KeyProperty::new("id", KeyType::Guid))
                .data(DataProperty::new("text", DataType::String))
                .vector(VectorProperty::new("embedding", 2))
        }
    }

    #[test]
    fn test_unnamed_vector_with_uuid_key() {
        let schema = Arc::new(SchemaReader::derive(&Memo::record_definition()).unwrap());
        let mapper = QdrantRecordMapper::<Memo>::new(schema, false).unwrap();
        let memo = Memo {
            id: Uuid::new_v4(),
            text: "hello".to_string(),
            embedding: Some(vec![0.1, 0.2]),
        };

        let point = mapper.to_storage(&memo).unwrap();
        assert_eq!(point.id, PointId::Uuid(memo.id));
        assert_eq!(point.vectors, Some(PointVectors::Unnamed(vec![0.1, 0.2])));

        let restored = mapper.from_storage(point, &GetRecordOptions::default()).unwrap();
        assert_eq!(restored, memo);
    }

    #[test]
    fn test_vector_shape_mismatch_is_mapping_error() {
        let schema = Arc::new(SchemaReader::derive(&Memo::record_definition()).unwrap());
        let mapper = QdrantRecordMapper::<Memo>::new(schema, false).unwrap();
        let point = PointStruct {
            id: PointId::Uuid(Uuid::new_v4()),
            vectors: Some(PointVectors::Named(BTreeMap::new())),
            payload: Map::new(),
        };
        let err = mapper
            .from_storage(point, &GetRecordOptions::default())
            .unwrap_err();
        assert!(matches!(err, VecBridgeError::Mapping(_)));
    }

    #[test]
    fn test_key_type_mismatch() {
        assert!(point_id_from_value(KeyType::UInt64, &json!("7")).is_err());
        assert_eq!(
            point_id_from_value(KeyType::UInt64, &json!(7)).unwrap(),
            PointId::Num(7)
        );
    }
}
