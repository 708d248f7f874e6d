//! Qdrant 向量存储

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::{Result, VectorStoreConfig};

use super::VectorStore;
use crate::client::QdrantClient;
use crate::collection::{CollectionManager, CollectionNames, QdrantCollectionManager};
use crate::key::RecordKey;
use crate::schema::{RecordDefinition, VectorStoreRecord};
use crate::store::{QdrantCollection, QdrantCollectionOptions, RecordCollection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QdrantVectorStoreOptions {
    pub has_named_vectors: bool,
}

impl QdrantVectorStoreOptions {
    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self {
            has_named_vectors: config.qdrant.has_named_vectors,
        }
    }
}

pub trait QdrantCollectionFactory: Send + Sync {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn QdrantClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
        options: &QdrantVectorStoreOptions,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQdrantCollectionFactory;

impl QdrantCollectionFactory for DefaultQdrantCollectionFactory {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn QdrantClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
        options: &QdrantVectorStoreOptions,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        let collection = QdrantCollection::<K, R>::new(
            client,
            name,
            QdrantCollectionOptions {
                has_named_vectors: options.has_named_vectors,
                record_definition: definition.cloned(),
                mapper: None,
            },
        )?;
        Ok(Arc::new(collection))
    }
}

pub struct QdrantVectorStore<F = DefaultQdrantCollectionFactory> {
    client: Arc<dyn QdrantClient>,
    options: QdrantVectorStoreOptions,
    manager: QdrantCollectionManager,
    factory: F,
}

impl QdrantVectorStore {
    pub fn new(client: Arc<dyn QdrantClient>, options: QdrantVectorStoreOptions) -> Self {
        Self::with_factory(client, options, DefaultQdrantCollectionFactory)
    }

    pub fn from_config(client: Arc<dyn QdrantClient>, config: &VectorStoreConfig) -> Self {
        Self::new(client, QdrantVectorStoreOptions::from_config(config))
    }
}

impl<F: QdrantCollectionFactory> QdrantVectorStore<F> {
    pub fn with_factory(
        client: Arc<dyn QdrantClient>,
        options: QdrantVectorStoreOptions,
        factory: F,
    ) -> Self {
        Self {
            manager: QdrantCollectionManager::new(client.clone(), options.has_named_vectors),
            client,
            options,
            factory,
        }
    }
}

#[async_trait]
impl<F: QdrantCollectionFactory> VectorStore for QdrantVectorStore<F> {
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
