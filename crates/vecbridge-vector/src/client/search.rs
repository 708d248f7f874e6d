//! 搜索索引服务客户端接口

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::ClientResult;

/// 索引中的一个文档
pub type SearchDocument = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchFieldDataType {
    String,
    Boolean,
    Int32,
    Int64,
    Double,
    Single,
    DateTimeOffset,
    Collection(Box<SearchFieldDataType>),
}

impl fmt::Display for SearchFieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchFieldDataType::String => write!(f, "Edm.String"),
            SearchFieldDataType::Boolean => write!(f, "Edm.Boolean"),
            SearchFieldDataType::Int32 => write!(f, "Edm.Int32"),
            SearchFieldDataType::Int64 => write!(f, "Edm.Int64"),
            SearchFieldDataType::Double => write!(f, "Edm.Double"),
            SearchFieldDataType::Single => write!(f, "Edm.Single"),
            SearchFieldDataType::DateTimeOffset => write!(f, "Edm.DateTimeOffset"),
            SearchFieldDataType::Collection(inner) => write!(f, "Collection({})", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub name: String,
    pub field_type: SearchFieldDataType,
    pub key: bool,
    pub filterable: bool,
    pub searchable: bool,
    pub vector_dimensions: Option<usize>,
    pub vector_search_profile: Option<String>,
}

impl SearchField {
    pub fn simple(name: impl Into<String>, field_type: SearchFieldDataType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            filterable: false,
            searchable: false,
            vector_dimensions: None,
            vector_search_profile: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorSearchAlgorithmKind {
    Hnsw,
    ExhaustiveKnn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorSearchMetric {
    Cosine,
    DotProduct,
    Euclidean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchAlgorithm {
    pub name: String,
    pub kind: VectorSearchAlgorithmKind,
    pub metric: VectorSearchMetric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchProfile {
    pub name: String,
    pub algorithm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub name: String,
    pub fields: Vec<SearchField>,
    pub algorithms: Vec<VectorSearchAlgorithm>,
    pub profiles: Vec<VectorSearchProfile>,
}

impl SearchIndex {
    pub fn key_field(&self) -> Option<&SearchField> {
        self.fields.iter().find(|f| f.key)
    }
}

/// 单个文档的写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub key: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait SearchIndexClient: Send + Sync {
    async fn create_index(&self, index: &SearchIndex) -> ClientResult<()>;

    /// 索引不存在时返回 `ClientError::NotFound`
    async fn get_index(&self, name: &str) -> ClientResult<SearchIndex>;

    async fn delete_index(&self, name: &str) -> ClientResult<()>;

    async fn list_index_names(&self) -> ClientResult<Vec<String>>;

    async fn get_document(
        &self,
        index: &str,
        key: &str,
        selected_fields: Option<&[String]>,
    ) -> ClientResult<Option<SearchDocument>>;

    /// 一次调用上传全部文档 (upload，整体替换同键文档)，按输入顺序返回每个文档的结果
    async fn upload_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> ClientResult<Vec<IndexingResult>>;

    async fn delete_documents(&self, index: &str, key_field: &str, keys: &[String]) -> ClientResult<()>;
}
