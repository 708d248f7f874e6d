//! RedisJSON 记录集合

use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{RedisConfig, Result, VecBridgeError};

use super::{CollectionCore, RecordCollection, string_key};
use crate::client::{ClientError, RedisClient, RedisJsonClient, RedisStorageType};
use crate::collection::RedisCollectionManager;
use crate::key::{KeyPrefixer, RecordKey};
use crate::mapper::{GetRecordOptions, JsonStorageRecord, RecordMapper, RedisJsonRecordMapper, json_kind};
use crate::schema::{
    KeyType, RecordDefinition, RecordSchema, SchemaReader, SupportedTypes, TypeValidator,
    VectorElementType, VectorStoreRecord,
};

const BACKEND: &str = "redis-json";

pub(crate) const REDIS_JSON_SUPPORTED_TYPES: SupportedTypes = SupportedTypes {
    backend: BACKEND,
    key_types: &[KeyType::String],
    data_types: None,
    allow_collections: true,
    vector_element_types: &[VectorElementType::Float32, VectorElementType::Float64],
};

pub type JsonRecordMapper<R> = Arc<dyn RecordMapper<R, Storage = JsonStorageRecord>>;

pub struct RedisJsonCollectionOptions<R> {
    pub prefix_collection_name_to_key_names: bool,
    /// 覆盖记录类型自身的声明
    pub record_definition: Option<RecordDefinition>,
    pub mapper: Option<JsonRecordMapper<R>>,
}

impl<R> Default for RedisJsonCollectionOptions<R> {
    fn default() -> Self {
        Self {
            prefix_collection_name_to_key_names: false,
            record_definition: None,
            mapper: None,
        }
    }
}

impl<R> RedisJsonCollectionOptions<R> {
    pub fn from_config(config: &RedisConfig) -> Self {
        Self {
            prefix_collection_name_to_key_names: config.prefix_collection_name_to_key_names,
            ..Default::default()
        }
    }
}

pub struct RedisJsonCollection<K, R> {
    client: Arc<dyn RedisJsonClient>,
    core: CollectionCore<RedisCollectionManager>,
    mapper: JsonRecordMapper<R>,
    prefixer: KeyPrefixer,
    /// 不含向量时读取的字段
    data_paths: Vec<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K: RecordKey, R: VectorStoreRecord> RedisJsonCollection<K, R> {
    pub fn new(
        client: Arc<dyn RedisJsonClient>,
        name: &str,
        options: RedisJsonCollectionOptions<R>,
    ) -> Result<Self> {
        let schema = SchemaReader::resolve::<R>(options.record_definition.as_ref())?;
        Self::with_schema(client, name, schema, options)
    }

    /// 使用已推导的模式构造，`options.record_definition` 被忽略
    pub fn with_schema(
        client: Arc<dyn RedisJsonClient>,
        name: &str,
        schema: Arc<RecordSchema>,
        options: RedisJsonCollectionOptions<R>,
    ) -> Result<Self> {
        TypeValidator::validate(&schema, &REDIS_JSON_SUPPORTED_TYPES)?;
        TypeValidator::validate_key_type(&schema, K::KEY_TYPE)?;

        let prefix_keys = options.prefix_collection_name_to_key_names;
        let mapper = options
            .mapper
            .unwrap_or_else(|| Arc::new(RedisJsonRecordMapper::new(schema.clone())) as JsonRecordMapper<R>);

        let base: Arc<dyn RedisClient> = client.clone();
        let manager = RedisCollectionManager::new(base, RedisStorageType::Json, prefix_keys);

        let data_paths = schema
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
            data_paths,
            _key: PhantomData,
        })
    }

    fn storage_key(&self, key: &K) -> Result<String> {
        Ok(self.prefixer.to_storage_key(&string_key(key)?))
    }

    fn paths(&self, options: &GetRecordOptions) -> Option<&[String]> {
        (!options.include_vectors).then_some(self.data_paths.as_slice())
    }

    fn wrap(&self, operation: &str, error: ClientError) -> VecBridgeError {
        error.into_store_error(BACKEND, &self.core.name, operation)
    }

    fn decode(&self, storage_key: &str, value: Value, options: &GetRecordOptions) -> Result<R> {
        let payload = match value {
            Value::Object(payload) => payload,
            other => {
                return Err(VecBridgeError::Mapping(format!(
                    "键 {} 的 JSON 值必须是对象，实际为 {}",
                    storage_key,
                    json_kind(&other)
                )));
            }
        };

        let key = self.prefixer.from_storage_key(storage_key)?.to_string();
        self.mapper.from_storage(JsonStorageRecord { key, payload }, options)
    }
}

#[async_trait]
impl<K: RecordKey, R: VectorStoreRecord> RecordCollection<K, R> for RedisJsonCollection<K, R> {
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
        tracing::debug!("JSON.GET {} from {}", storage_key, self.core.name);

        let value = self
            .client
            .json_get(&storage_key, self.paths(&options))
            .await
            .map_err(|e| self.wrap("JSON.GET", e))?
            .ok_or_else(|| self.core.not_found(&storage_key))?;

        self.decode(&storage_key, value, &options)
    }

    async fn get_batch(&self, keys: &[K], options: GetRecordOptions) -> Result<Vec<R>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let storage_keys = keys
            .iter()
            .map(|key| self.storage_key(key))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("JSON.MGET {} keys from {}", storage_keys.len(), self.core.name);

        let values = self
            .client
            .json_mget(&storage_keys, self.paths(&options))
            .await
            .map_err(|e| self.wrap("JSON.MGET", e))?;

        if values.len() != storage_keys.len() {
            return Err(VecBridgeError::Mapping(format!(
                "JSON.MGET 请求 {} 个键，返回 {} 个结果",
                storage_keys.len(),
                values.len()
            )));
        }

        storage_keys
            .iter()
            .zip(values)
            .map(|(storage_key, value)| {
                let value = value.ok_or_else(|| self.core.not_found(storage_key))?;
                self.decode(storage_key, value, &options)
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

        let mut keys = Vec::with_capacity(records.len());
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let JsonStorageRecord { key, payload } = self.mapper.to_storage(record)?;
            keys.push(K::from_value(&Value::String(key.clone()))?);
            entries.push((self.prefixer.to_storage_key(&key), Value::Object(payload)));
        }
        tracing::debug!("JSON.MSET {} records into {}", entries.len(), self.core.name);

        self.client
            .json_mset(&entries)
            .await
            .map_err(|e| self.wrap("JSON.MSET", e))?;

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
