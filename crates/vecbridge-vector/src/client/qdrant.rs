//! Qdrant 客户端接口

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::ClientResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointVectors {
    Unnamed(Vec<f32>),
    Named(BTreeMap<String, Vec<f32>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStruct {
    pub id: PointId,
    pub vectors: Option<PointVectors>,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QdrantDistance {
    Cosine,
    Dot,
    Euclid,
    Manhattan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: u64,
    pub distance: QdrantDistance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorsConfig {
    Single(VectorParams),
    Named(BTreeMap<String, VectorParams>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSchemaType {
    Keyword,
    Integer,
    Float,
    Bool,
    Datetime,
    Uuid,
    Text,
}

#[async_trait]
pub trait QdrantClient: Send + Sync {
    /// 集合已存在时返回 `ClientError::AlreadyExists`
    async fn create_collection(&self, name: &str, vectors: &VectorsConfig) -> ClientResult<()>;

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        schema: PayloadSchemaType,
    ) -> ClientResult<()>;

    async fn collection_exists(&self, name: &str) -> ClientResult<bool>;

    async fn delete_collection(&self, name: &str) -> ClientResult<()>;

    async fn list_collections(&self) -> ClientResult<Vec<String>>;

    /// 只返回存在的点，顺序不保证
    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
        with_payload: bool,
        with_vectors: bool,
    ) -> ClientResult<Vec<PointStruct>>;

    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> ClientResult<()>;

    async fn delete(&self, collection: &str, ids: &[PointId]) -> ClientResult<()>;
}
