//! 搜索索引向量存储

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::Result;

use super::VectorStore;
use crate::client::SearchIndexClient;
use crate::collection::{CollectionManager, CollectionNames, SearchIndexCollectionManager};
use crate::key::RecordKey;
use crate::schema::{RecordDefinition, VectorStoreRecord};
use crate::store::{RecordCollection, SearchIndexCollection, SearchIndexCollectionOptions};

pub trait SearchIndexCollectionFactory: Send + Sync {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn SearchIndexClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSearchIndexCollectionFactory;

impl SearchIndexCollectionFactory for DefaultSearchIndexCollectionFactory {
    fn create_collection<K, R>(
        &self,
        client: Arc<dyn SearchIndexClient>,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        let collection = SearchIndexCollection::<K, R>::new(
            client,
            name,
            SearchIndexCollectionOptions {
                record_definition: definition.cloned(),
                mapper: None,
            },
        )?;
        Ok(Arc::new(collection))
    }
}

pub struct SearchIndexVectorStore<F = DefaultSearchIndexCollectionFactory> {
    client: Arc<dyn SearchIndexClient>,
    manager: SearchIndexCollectionManager,
    factory: F,
}

impl SearchIndexVectorStore {
    pub fn new(client: Arc<dyn SearchIndexClient>) -> Self {
        Self::with_factory(client, DefaultSearchIndexCollectionFactory)
    }
}

impl<F: SearchIndexCollectionFactory> SearchIndexVectorStore<F> {
    pub fn with_factory(client: Arc<dyn SearchIndexClient>, factory: F) -> Self {
        Self {
            manager: SearchIndexCollectionManager::new(client.clone()),
            client,
            factory,
        }
    }
}

#[async_trait]
impl<F: SearchIndexCollectionFactory> VectorStore for SearchIndexVectorStore<F> {
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
            .create_collection(self.client.clone(), name, definition)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.manager.delete_collection(name).await
    }

    fn list_collection_names(&self) -> CollectionNames {
        self.manager.list_collection_names()
    }
}
