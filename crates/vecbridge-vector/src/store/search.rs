//! 搜索索引记录集合

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use super::{CollectionCore, RecordCollection, string_key};
use crate::client::{ClientError, SearchDocument, SearchIndexClient};
use crate::collection::SearchIndexCollectionManager;
use crate::key::RecordKey;
use crate::mapper::{GetRecordOptions, RecordMapper, SearchIndexRecordMapper, document_key};
use crate::schema::{
    DataType, KeyType, RecordDefinition, RecordSchema, SchemaReader, SupportedTypes,
    TypeValidator, VectorElementType, VectorStoreRecord,
};

const BACKEND: &str = "search-index";

pub(crate) const SEARCH_INDEX_SUPPORTED_TYPES: SupportedTypes = SupportedTypes {
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
    allow_collections: true,
    vector_element_types: &[VectorElementType::Float32],
};

pub type SearchDocumentMapper<R> = Arc<dyn RecordMapper<R, Storage = SearchDocument>>;

pub struct SearchIndexCollectionOptions<R> {
    pub record_definition: Option<RecordDefinition>,
    pub mapper: Option<SearchDocumentMapper<R>>,
}

impl<R> Default for SearchIndexCollectionOptions<R> {
    fn default() -> Self {
        Self {
            record_definition: None,
            mapper: None,
        }
    }
}

pub struct SearchIndexCollection<K, R> {
    client: Arc<dyn SearchIndexClient>,
    core: CollectionCore<SearchIndexCollectionManager>,
    mapper: SearchDocumentMapper<R>,
    /// 不含向量时选择的字段，包括键
    non_vector_fields: Vec<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K: RecordKey, R: VectorStoreRecord> SearchIndexCollection<K, R> {
    pub fn new(
        client: Arc<dyn SearchIndexClient>,
        name: &str,
        options: SearchIndexCollectionOptions<R>,
    ) -> Result<Self> {
        let schema = SchemaReader::resolve::<R>(options.record_definition.as_ref())?;
        Self::with_schema(client, name, schema, options)
    }

    pub fn with_schema(
        client: Arc<dyn SearchIndexClient>,
        name: &str,
        schema: Arc<RecordSchema>,
        options: SearchIndexCollectionOptions<R>,
    ) -> Result<Self> {
        TypeValidator::validate(&schema, &SEARCH_INDEX_SUPPORTED_TYPES)?;
        TypeValidator::validate_key_type(&schema, K::KEY_TYPE)?;

        let mapper = options.mapper.unwrap_or_else(|| {
            Arc::new(SearchIndexRecordMapper::new(schema.clone())) as SearchDocumentMapper<R>
        });
        let non_vector_fields = schema.non_vector_storage_names();

        Ok(Self {
            core: CollectionCore {
                name: name.to_string(),
                schema,
                manager: SearchIndexCollectionManager::new(client.clone()),
            },
            client,
            mapper,
            non_vector_fields,
            _key: PhantomData,
        })
    }

    fn key_field(&self) -> &str {
        self.core.schema.key_property().storage_name()
    }

    fn wrap(&self, operation: &str, error: ClientError) -> VecBridgeError {
        error.into_store_error(BACKEND, &self.core.name, operation)
    }
}

#[async_trait]
impl<K: RecordKey, R: VectorStoreRecord> RecordCollection<K, R> for SearchIndexCollection<K, R> {
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
        let key = string_key(key)?;
        tracing::debug!("Getting document {} from index {}", key, self.core.name);

        let selected = (!options.include_vectors).then_some(self.non_vector_fields.as_slice());
        let document = self
            .client
            .get_document(&self.core.name, &key, selected)
            .await
            .map_err(|e| self.wrap("GetDocument", e))?
            .ok_or_else(|| self.core.not_found(&key))?;

        self.mapper.from_storage(document, &options)
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
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            let document = self.mapper.to_storage(record)?;
            keys.push(K::from_value(&Value::String(document_key(
                &self.core.schema,
                &document,
            )?))?);
            documents.push(document);
        }
        tracing::debug!("Uploading {} documents to index {}", documents.len(), self.core.name);
        let expected = documents.len();

        let results = self
            .client
            .upload_documents(&self.core.name, documents)
            .await
            .map_err(|e| self.wrap("UploadDocuments", e))?;

        if results.len() != expected {
            return Err(VecBridgeError::Backend {
                backend: BACKEND.to_string(),
                collection: self.core.name.clone(),
                operation: "UploadDocuments".to_string(),
                message: format!("上传 {} 个文档，只返回 {} 个结果", expected, results.len()),
            });
        }

        let failures: Vec<String> = results
            .iter()
            .filter(|r| !r.succeeded)
            .map(|r| {
                format!(
                    "{}: {}",
                    r.key,
                    r.error_message.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();
        if !failures.is_empty() {
            return Err(VecBridgeError::Backend {
                backend: BACKEND.to_string(),
                collection: self.core.name.clone(),
                operation: "UploadDocuments".to_string(),
                message: failures.join("; "),
            });
        }

        Ok(keys)
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.delete_batch(std::slice::from_ref(key)).await
    }

    async fn delete_batch(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let keys = keys.iter().map(string_key).collect::<Result<Vec<_>>>()?;
        tracing::debug!("Deleting {} documents from index {}", keys.len(), self.core.name);

        self.client
            .delete_documents(&self.core.name, self.key_field(), &keys)
            .await
            .map_err(|e| self.wrap("DeleteDocuments", e))
    }
}
