//! Redis 向量存储 (JSON 或 Hash)

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError, VectorBackend, VectorStoreConfig};

use super::VectorStore;
use crate::client::{RedisClient, RedisHashClient, RedisJsonClient, RedisStorageType};
use crate::collection::{CollectionManager, CollectionNames, RedisCollectionManager};
use crate::key::RecordKey;
use crate::schema::{RecordDefinition, VectorStoreRecord};
use crate::store::{
    RecordCollection, RedisHashCollection, RedisHashCollectionOptions, RedisJsonCollection,
    RedisJsonCollectionOptions,
};

/// 同时支持 JSON 与 Hash 命令的客户端
pub trait RedisStoreClient: RedisJsonClient + RedisHashClient {}

impl<T: RedisJsonClient + RedisHashClient> RedisStoreClient for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedisVectorStoreOptions {
    pub storage_type: RedisStorageType,
    pub prefix_collection_name_to_key_names: bool,
}

impl Default for RedisVectorStoreOptions {
    fn default() -> Self {
        Self {
            storage_type: RedisStorageType::Json,
            prefix_collection_name_to_key_names: false,
        }
    }
}

impl RedisVectorStoreOptions {
    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        let storage_type = match config.backend {
            VectorBackend::RedisJson => RedisStorageType::Json,
            VectorBackend::RedisHash => RedisStorageType::Hash,
            other => {
                return Err(VecBridgeError::Config(format!(
                    "后端 {:?} 不是 Redis 后端",
                    other
                )));
            }
        };

        Ok(Self {
            storage_type,
            prefix_collection_name_to_key_names: config.redis.prefix_collection_name_to_key_names,
        })
    }
}

pub trait RedisCollectionFactory: Send + Sync {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn RedisStoreClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
        options: &RedisVectorStoreOptions,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRedisCollectionFactory;

impl RedisCollectionFactory for DefaultRedisCollectionFactory {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn RedisStoreClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
        options: &RedisVectorStoreOptions,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        let prefix = options.prefix_collection_name_to_key_names;
        match options.storage_type {
            RedisStorageType::Json => {
                let client: Arc<dyn RedisJsonClient> = client;
                let collection = RedisJsonCollection::<K, R>::new(
                    client,
                    name,
                    RedisJsonCollectionOptions {
                        prefix_collection_name_to_key_names: prefix,
                        record_definition: definition.cloned(),
                        mapper: None,
                    },
                )?;
                Ok(Arc::new(collection))
            }
            RedisStorageType::Hash => {
                let client: Arc<dyn RedisHashClient> = client;
                let collection = RedisHashCollection::<K, R>::new(
                    client,
                    name,
                    RedisHashCollectionOptions {
                        prefix_collection_name_to_key_names: prefix,
                        record_definition: definition.cloned(),
                        mapper: None,
                    },
                )?;
                Ok(Arc::new(collection))
            }
        }
    }
}

pub struct RedisVectorStore<F = DefaultRedisCollectionFactory> {
    client: Arc<dyn RedisStoreClient>,
    options: RedisVectorStoreOptions,
    manager: RedisCollectionManager,
    factory: F,
}

impl RedisVectorStore {
    pub fn new(client: Arc<dyn RedisStoreClient>, options: RedisVectorStoreOptions) -> Self {
        Self::with_factory(client, options, DefaultRedisCollectionFactory)
    }

    pub fn from_config(client: Arc<dyn RedisStoreClient>, config: &VectorStoreConfig) -> Result<Self> {
        Ok(Self::new(client, RedisVectorStoreOptions::from_config(config)?))
    }
}

impl<F: RedisCollectionFactory> RedisVectorStore<F> {
    pub fn with_factory(
        client: Arc<dyn RedisStoreClient>,
        options: RedisVectorStoreOptions,
        factory: F,
    ) -> Self {
        let base: Arc<dyn RedisClient> = client.clone();
        let manager = RedisCollectionManager::new(
            base,
            options.storage_type,
            options.prefix_collection_name_to_key_names,
        );
        Self {
            client,
            options,
            manager,
            factory,
        }
    }

    pub fn options(&self) -> &RedisVectorStoreOptions {
        &self.options
    }
}

#[async_trait]
impl<F: RedisCollectionFactory> VectorStore for RedisVectorStore<F> {
    fn get_collection<K, R>(
        &self,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        self.factory
            .create_collection(self.client.clone(), name, definition, &self.options)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.manager.delete_collection(name).await
    }

    fn list_collection_names(&self) -> CollectionNames {
        self.manager.list_collection_names()
    }
}
