//! Redis Hash 记录集合
//!
//! Hash 没有原生的多键读取，批量读取按键并发执行，结果保持输入顺序。

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{RedisConfig, Result, VecBridgeError};

use super::{CollectionCore, RecordCollection, string_key};
use crate::client::{ClientError, RedisClient, RedisHashClient, RedisStorageType};
use crate::collection::RedisCollectionManager;
use crate::key::{KeyPrefixer, RecordKey};
use crate::mapper::{GetRecordOptions, HashStorageRecord, RecordMapper, RedisHashRecordMapper};
use crate::schema::{
    DataType, KeyType, RecordDefinition, RecordSchema, SchemaReader, SupportedTypes,
    TypeValidator, VectorElementType, VectorStoreRecord,
};

const BACKEND: &str = "redis-hash";

pub(crate) const REDIS_HASH_SUPPORTED_TYPES: SupportedTypes = SupportedTypes {
    backend: BACKEND,
    key_types: &[KeyType::String],
    data_types: Some(&[
        DataType::String,
        DataType::Bool,
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::DateTime,
        DataType::Guid,
    ]),
    allow_collections: false,
    vector_element_types: &[VectorElementType::Float32, VectorElementType::Float64],
};

pub type HashRecordMapper<R> = Arc<dyn RecordMapper<R, Storage = HashStorageRecord>>;

pub struct RedisHashCollectionOptions<R> {
    pub prefix_collection_name_to_key_names: bool,
    pub record_definition: Option<RecordDefinition>,
    pub mapper: Option<HashRecordMapper<R>>,
}

impl<R> Default for RedisHashCollectionOptions<R> {
    fn default() -> Self {
        Self {
            prefix_collection_name_to_key_names: false,
            record_definition: None,
            mapper: None,
        }
    }
}

impl<R> RedisHashCollectionOptions<R> {
    pub fn from_config(config: &RedisConfig) -> Self {
        Self {
            prefix_collection_name_to_key_names: config.prefix_collection_name_to_key_names,
            ..Default::default()
        }
    }
}

pub struct RedisHashCollection<K, R> {
    client: Arc<dyn RedisHashClient>,
    core: CollectionCore<RedisCollectionManager>,
    mapper: HashRecordMapper<R>,
    prefixer: KeyPrefixer,
    data_fields: Vec<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K: RecordKey, R: VectorStoreRecord> RedisHashCollection<K, R> {
    pub fn new(
        client: Arc<dyn RedisHashClient>,
        name: &str,
        options: RedisHashCollectionOptions<R>,
    ) -> Result<Self> {
        let schema = SchemaReader::resolve::<R>(options.record_definition.as_ref())?;
        Self::with_schema(client, name, schema, options)
    }

    pub fn with_schema(
        client: Arc<dyn RedisHashClient>,
        name: &str,
        schema: Arc<RecordSchema>,
        options: RedisHashCollectionOptions<R>,
    ) -> Result<Self> {
        TypeValidator::validate(&schema, &REDIS_HASH_SUPPORTED_TYPES)?;
        TypeValidator::validate_key_type(&schema, K::KEY_TYPE)?;

        let prefix_keys = options.prefix_collection_name_to_key_names;
        let mapper = options
            .mapper
            .unwrap_or_else(|| Arc::new(RedisHashRecordMapper::new(schema.clone())) as HashRecordMapper<R>);

        let base: Arc<dyn RedisClient> = client.clone();
        let manager = RedisCollectionManager::new(base, RedisStorageType::Hash, prefix_keys);

        let data_fields = schema
            .data_properties()
            .iter()
            .map(|p| p.storage_name().to_string())
            .collect();

        Ok(Self {
            client,
            core: CollectionCore {
                name: name.to_string(),
                schema,
                manager,
            },
            mapper,
            prefixer: KeyPrefixer::new(name, prefix_keys),
            data_fields,
            _key: PhantomData,
        })
    }

    fn storage_key(&self, key: &K) -> Result<String> {
        Ok(self.prefixer.to_storage_key(&string_key(key)?))
    }

    fn wrap(&self, operation: &str, error: ClientError) -> VecBridgeError {
        error.into_store_error(BACKEND, &self.core.name, operation)
    }
}

#[async_trait]
impl<K: RecordKey, R: VectorStoreRecord> RecordCollection<K, R> for RedisHashCollection<K, R> {
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
        let storage_key = self.storage_key(key)?;
        tracing::debug!("HGET {} from {}", storage_key, self.core.name);

        // 没有数据字段时 HMGET 无参数可用，退回 HGETALL，由映射器丢弃向量
        let fields = (!options.include_vectors && !self.data_fields.is_empty())
            .then_some(self.data_fields.as_slice());
        let entries = self
            .client
            .hget(&storage_key, fields)
            .await
            .map_err(|e| self.wrap("HGET", e))?
            .ok_or_else(|| self.core.not_found(&storage_key))?;

        let key = self.prefixer.from_storage_key(&storage_key)?.to_string();
        self.mapper
            .from_storage(HashStorageRecord { key, entries }, &options)
    }

    async fn get_batch(&self, keys: &[K], options: GetRecordOptions) -> Result<Vec<R>> {
        try_join_all(keys.iter().map(|key| self.get(key, options))).await
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

        let mut keys = Vec::with_capacity(records.len());
        let mut hashes = Vec::with_capacity(records.len());
        for record in records {
            let HashStorageRecord { key, entries } = self.mapper.to_storage(record)?;
            keys.push(K::from_value(&Value::String(key.clone()))?);
            hashes.push((self.prefixer.to_storage_key(&key), entries));
        }
        tracing::debug!("HSET {} records into {}", hashes.len(), self.core.name);

        self.client
            .hset_multiple(&hashes)
            .await
            .map_err(|e| self.wrap("HSET", e))?;

        Ok(keys)
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.delete_batch(std::slice::from_ref(key)).await
    }

    async fn delete_batch(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let storage_keys = keys
            .iter()
            .map(|key| self.storage_key(key))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("DEL {} keys from {}", storage_keys.len(), self.core.name);

        self.client
            .del(&storage_keys)
            .await
            .map_err(|e| self.wrap("DEL", e))?;
        Ok(())
    }
}
