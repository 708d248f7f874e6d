//! Qdrant 记录集合

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{QdrantConfig, Result, VecBridgeError};

use super::{CollectionCore, RecordCollection};
use crate::client::{ClientError, PointId, PointStruct, QdrantClient};
use crate::collection::QdrantCollectionManager;
use crate::key::RecordKey;
use crate::mapper::{
    GetRecordOptions, QdrantRecordMapper, RecordMapper, point_id_from_value, point_id_to_value,
};
use crate::schema::{
    KeyType, RecordDefinition, RecordSchema, SchemaReader, SupportedTypes, TypeValidator,
    VectorElementType, VectorStoreRecord,
};

const BACKEND: &str = "qdrant";

pub(crate) const QDRANT_SUPPORTED_TYPES: SupportedTypes = SupportedTypes {
    backend: BACKEND,
    key_types: &[KeyType::UInt64, KeyType::Guid],
    data_types: None,
    allow_collections: true,
    vector_element_types: &[VectorElementType::Float32],
};

pub type PointMapper<R> = Arc<dyn RecordMapper<R, Storage = PointStruct>>;

pub struct QdrantCollectionOptions<R> {
    /// 为 false 时集合只能有一个向量属性
    pub has_named_vectors: bool,
    pub record_definition: Option<RecordDefinition>,
    pub mapper: Option<PointMapper<R>>,
}

impl<R> Default for QdrantCollectionOptions<R> {
    fn default() -> Self {
        Self {
            has_named_vectors: false,
            record_definition: None,
            mapper: None,
        }
    }
}

impl<R> QdrantCollectionOptions<R> {
    pub fn from_config(config: &QdrantConfig) -> Self {
        Self {
            has_named_vectors: config.has_named_vectors,
            ..Default::default()
        }
    }
}

pub struct QdrantCollection<K, R> {
    client: Arc<dyn QdrantClient>,
    core: CollectionCore<QdrantCollectionManager>,
    mapper: PointMapper<R>,
    _key: PhantomData<fn() -> K>,
}

impl<K: RecordKey, R: VectorStoreRecord> QdrantCollection<K, R> {
    pub fn new(
        client: Arc<dyn QdrantClient>,
        name: &str,
        options: QdrantCollectionOptions<R>,
    ) -> Result<Self> {
        let schema = SchemaReader::resolve::<R>(options.record_definition.as_ref())?;
        Self::with_schema(client, name, schema, options)
    }

    pub fn with_schema(
        client: Arc<dyn QdrantClient>,
        name: &str,
        schema: Arc<RecordSchema>,
        options: QdrantCollectionOptions<R>,
    ) -> Result<Self> {
        TypeValidator::validate(&schema, &QDRANT_SUPPORTED_TYPES)?;
        TypeValidator::validate_key_type(&schema, K::KEY_TYPE)?;

        let mapper = match options.mapper {
            Some(mapper) => mapper,
            None => Arc::new(QdrantRecordMapper::new(
                schema.clone(),
                options.has_named_vectors,
            )?) as PointMapper<R>,
        };

        Ok(Self {
            core: CollectionCore {
                name: name.to_string(),
                schema,
                manager: QdrantCollectionManager::new(client.clone(), options.has_named_vectors),
            },
            client,
            mapper,
            _key: PhantomData,
        })
    }

    fn point_id(&self, key: &K) -> Result<PointId> {
        point_id_from_value(self.core.schema.key_property().key_type, &key.to_value())
    }

    fn wrap(&self, operation: &str, error: ClientError) -> VecBridgeError {
        error.into_store_error(BACKEND, &self.core.name, operation)
    }
}

#[async_trait]
impl<K: RecordKey, R: VectorStoreRecord> RecordCollection<K, R> for QdrantCollection<K, R> {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn schema(&self) -> &Arc<RecordSchema> {
        &self.core.schema
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.core.exists().await
    }

    async fn create_collection(&self) -> Result<()> {
        self.core.create().await
    }

    async fn create_collection_if_not_exists(&self) -> Result<()> {
        self.core.create_if_not_exists().await
    }

    async fn delete_collection(&self) -> Result<()> {
        self.core.delete().await
    }

    async fn get(&self, key: &K, options: GetRecordOptions) -> Result<R> {
        let mut records = self.get_batch(std::slice::from_ref(key), options).await?;
        records
            .pop()
            .ok_or_else(|| self.core.not_found(&format!("{:?}", key)))
    }

    async fn get_batch(&self, keys: &[K], options: GetRecordOptions) -> Result<Vec<R>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let ids = keys
            .iter()
            .map(|key| self.point_id(key))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Retrieving {} points from {}", ids.len(), self.core.name);

        let points = self
            .client
            .retrieve(&self.core.name, &ids, true, options.include_vectors)
            .await
            .map_err(|e| self.wrap("Retrieve", e))?;

        // 后端不保证顺序，按输入顺序重排
        let by_id: HashMap<PointId, PointStruct> = points.into_iter().map(|p| (p.id, p)).collect();

        ids.iter()
            .map(|id| {
                let point = by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| self.core.not_found(&id.to_string()))?;
                self.mapper.from_storage(point, &options)
            })
            .collect()
    }

    async fn upsert(&self, record: &R) -> Result<K> {
        let mut keys = self.upsert_batch(std::slice::from_ref(record)).await?;
        keys.pop()
            .ok_or_else(|| VecBridgeError::Mapping("写入未返回键".to_string()))
    }

    async fn upsert_batch(&self, records: &[R]) -> Result<Vec<K>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let points = records
            .iter()
            .map(|record| self.mapper.to_storage(record))
            .collect::<Result<Vec<_>>>()?;
        let keys = points
            .iter()
            .map(|point| K::from_value(&point_id_to_value(&point.id)))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Upserting {} points into {}", points.len(), self.core.name);

        self.client
            .upsert(&self.core.name, points)
            .await
            .map_err(|e| self.wrap("Upsert", e))?;

        Ok(keys)
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.delete_batch(std::slice::from_ref(key)).await
    }

    async fn delete_batch(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let ids = keys
            .iter()
            .map(|key| self.point_id(key))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Deleting {} points from {}", ids.len(), self.core.name);

        self.client
            .delete(&self.core.name, &ids)
            .await
            .map_err(|e| self.wrap("Delete", e))
    }
}
