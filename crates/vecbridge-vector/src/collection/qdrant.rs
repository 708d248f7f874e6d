//! Qdrant 集合管理

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{CollectionManager, CollectionNames, lazy_names, require_dimensions};
use crate::client::{ClientError, PayloadSchemaType, QdrantClient, QdrantDistance, VectorParams, VectorsConfig};
use crate::schema::{DataProperty, DataType, DistanceFunction, IndexKind, RecordSchema, VectorProperty};

const BACKEND: &str = "qdrant";

pub struct QdrantCollectionManager {
    client: Arc<dyn QdrantClient>,
    has_named_vectors: bool,
}

impl QdrantCollectionManager {
    pub fn new(client: Arc<dyn QdrantClient>, has_named_vectors: bool) -> Self {
        Self {
            client,
            has_named_vectors,
        }
    }

    pub fn vectors_config(&self, schema: &RecordSchema) -> Result<VectorsConfig> {
        let vectors = schema.vector_properties();
        if self.has_named_vectors {
            let mut named = BTreeMap::new();
            for property in vectors {
                named.insert(property.storage_name().to_string(), vector_params(property)?);
            }
            return Ok(VectorsConfig::Named(named));
        }

        match vectors {
            [single] => Ok(VectorsConfig::Single(vector_params(single)?)),
            _ => Err(VecBridgeError::Config(format!(
                "未启用命名向量时只能有一个向量属性，实际有 {} 个",
                vectors.len()
            ))),
        }
    }

    /// 需要建立 payload 索引的字段
    pub fn payload_indexes(schema: &RecordSchema) -> Result<Vec<(String, PayloadSchemaType)>> {
        schema
            .data_properties()
            .iter()
            .filter(|p| p.is_filterable || p.is_full_text_searchable)
            .map(|p| Ok((p.storage_name().to_string(), payload_schema_type(p)?)))
            .collect()
    }
}

fn vector_params(property: &VectorProperty) -> Result<VectorParams> {
    let size = require_dimensions(property)? as u64;

    if property.index_kind != IndexKind::Hnsw {
        return Err(VecBridgeError::Config(format!(
            "Qdrant 不支持向量属性 '{}' 的索引类型 {:?}",
            property.name, property.index_kind
        )));
    }

    let distance = match property.distance_function {
        DistanceFunction::Cosine => QdrantDistance::Cosine,
        DistanceFunction::DotProduct => QdrantDistance::Dot,
        DistanceFunction::Euclidean => QdrantDistance::Euclid,
        DistanceFunction::Manhattan => QdrantDistance::Manhattan,
    };

    Ok(VectorParams { size, distance })
}

fn payload_schema_type(property: &DataProperty) -> Result<PayloadSchemaType> {
    if property.is_full_text_searchable {
        return match property.data_type.element_type() {
            DataType::String => Ok(PayloadSchemaType::Text),
            other => Err(VecBridgeError::Config(format!(
                "全文检索属性 '{}' 必须是字符串，实际为 {:?}",
                property.name, other
            ))),
        };
    }

    Ok(match property.data_type.element_type() {
        DataType::String => PayloadSchemaType::Keyword,
        DataType::Int32 | DataType::Int64 => PayloadSchemaType::Integer,
        DataType::Float32 | DataType::Float64 => PayloadSchemaType::Float,
        DataType::Bool => PayloadSchemaType::Bool,
        DataType::DateTime => PayloadSchemaType::Datetime,
        DataType::Guid => PayloadSchemaType::Uuid,
        DataType::Collection(_) => {
            return Err(VecBridgeError::Config(format!(
                "属性 '{}' 不能是嵌套集合",
                property.name
            )));
        }
    })
}

#[async_trait]
impl CollectionManager for QdrantCollectionManager {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, schema: &RecordSchema) -> Result<()> {
        let vectors = self.vectors_config(schema)?;
        let payload_indexes = Self::payload_indexes(schema)?;

        self.client
            .create_collection(name, &vectors)
            .await
            .map_err(|e| e.into_store_error(BACKEND, name, "create_collection"))?;

        for (field, schema_type) in &payload_indexes {
            if let Err(e) = self.client.create_payload_index(name, field, *schema_type).await {
                // 索引不完整的集合不能留下，否则后续 create_if_not_exists 会误判为已就绪
                if let Err(cleanup) = self.client.delete_collection(name).await {
                    tracing::warn!("Failed to drop partially created collection {}: {}", name, cleanup);
                }
                return Err(VecBridgeError::Backend {
                    backend: BACKEND.to_string(),
                    collection: name.to_string(),
                    operation: format!("create_payload_index({})", field),
                    message: e.to_string(),
                });
            }
        }

        tracing::info!(
            "Created Qdrant collection {} ({} payload indexes)",
            name,
            payload_indexes.len()
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| e.into_store_error(BACKEND, name, "collection_exists"))
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        match self.client.delete_collection(name).await {
            Ok(()) => {
                tracing::info!("Deleted Qdrant collection {}", name);
                Ok(())
            }
            Err(ClientError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into_store_error(BACKEND, name, "delete_collection")),
        }
    }

    fn list_collection_names(&self) -> CollectionNames {
        let client = self.client.clone();
        lazy_names(async move {
            client
                .list_collections()
                .await
                .map_err(|e| e.into_store_error(BACKEND, "*", "list_collections"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientResult, PointId, PointStruct};
    use crate::schema::{KeyProperty, KeyType, RecordDefinition, SchemaReader};
    use std::sync::Mutex;

    /// 只记录集合生命周期调用；payload 索引按配置返回错误
    #[derive(Default)]
    struct ScriptedQdrant {
        index_error: Option<ClientError>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedQdrant {
        fn failing_index(error: ClientError) -> Self {
            Self {
                index_error: Some(error),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QdrantClient for ScriptedQdrant {
        async fn create_collection(&self, name: &str, _vectors: &VectorsConfig) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("create {}", name));
            Ok(())
        }
        async fn create_payload_index(
            &self,
            _collection: &str,
            field: &str,
            _schema: PayloadSchemaType,
        ) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("index {}", field));
            match &self.index_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
        async fn collection_exists(&self, _name: &str) -> ClientResult<bool> {
            Ok(false)
        }
        async fn delete_collection(&self, name: &str) -> ClientResult<()> {
            self.calls.lock().unwrap().push(format!("delete {}", name));
            Ok(())
        }
        async fn list_collections(&self) -> ClientResult<Vec<String>> {
            Ok(vec![])
        }
        async fn retrieve(
            &self,
            _collection: &str,
            _ids: &[PointId],
            _with_payload: bool,
            _with_vectors: bool,
        ) -> ClientResult<Vec<PointStruct>> {
            Ok(vec![])
        }
        async fn upsert(&self, _collection: &str, _points: Vec<PointStruct>) -> ClientResult<()> {
            Ok(())
        }
        async fn delete(&self, _collection: &str, _ids: &[PointId]) -> ClientResult<()> {
            Ok(())
        }
    }

    fn schema_with(vectors: Vec<VectorProperty>) -> RecordSchema {
        let mut definition = RecordDefinition::new()
            .key(KeyProperty::new("id", KeyType::UInt64))
            .data(DataProperty::new("title", DataType::String).filterable());
        for vector in vectors {
            definition = definition.vector(vector);
        }
        SchemaReader::derive(&definition).unwrap()
    }

    fn manager(named: bool) -> QdrantCollectionManager {
        QdrantCollectionManager::new(Arc::new(ScriptedQdrant::default()), named)
    }

    #[test]
    fn test_flat_index_is_rejected() {
        let property = VectorProperty::new("v", 4).with_index_kind(IndexKind::Flat);
        let err = vector_params(&property).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));
    }

    #[test]
    fn test_missing_dimensions_is_rejected() {
        let err = vector_params(&VectorProperty::without_dimensions("v")).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));

        let schema = schema_with(vec![VectorProperty::without_dimensions("v")]);
        let err = manager(true).vectors_config(&schema).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));
    }

    #[test]
    fn test_unnamed_mode_needs_exactly_one_vector() {
        let schema = schema_with(vec![VectorProperty::new("a", 2), VectorProperty::new("b", 3)]);
        let err = manager(false).vectors_config(&schema).unwrap_err();
        assert!(matches!(err, VecBridgeError::Config(_)));

        match manager(true).vectors_config(&schema).unwrap() {
            VectorsConfig::Named(named) => assert_eq!(named.len(), 2),
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_single_vector_params() {
        let schema = schema_with(vec![
            VectorProperty::new("v", 8).with_distance_function(DistanceFunction::Manhattan),
        ]);
        match manager(false).vectors_config(&schema).unwrap() {
            VectorsConfig::Single(params) => {
                assert_eq!(params.size, 8);
                assert_eq!(params.distance, QdrantDistance::Manhattan);
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_payload_index_drops_collection() {
        let client = Arc::new(ScriptedQdrant::failing_index(ClientError::Transport(
            "index rejected".to_string(),
        )));
        let manager = QdrantCollectionManager::new(client.clone(), true);
        let schema = schema_with(vec![VectorProperty::new("v", 4)]);

        let err = manager.create_collection("articles", &schema).await.unwrap_err();
        assert!(matches!(err, VecBridgeError::Backend { .. }));
        assert_eq!(
            client.calls(),
            vec!["create articles", "index title", "delete articles"]
        );
    }

    #[tokio::test]
    async fn test_payload_index_conflict_is_not_a_create_race() {
        let client = Arc::new(ScriptedQdrant::failing_index(ClientError::AlreadyExists(
            "title".to_string(),
        )));
        let manager = QdrantCollectionManager::new(client.clone(), true);
        let schema = schema_with(vec![VectorProperty::new("v", 4)]);

        let err = manager
            .create_collection_if_not_exists("articles", &schema)
            .await
            .unwrap_err();
        assert!(!err.is_already_exists());
        assert!(matches!(err, VecBridgeError::Backend { .. }));
    }
}
