//! Redis 客户端接口 (RediSearch 索引 + RedisJSON + Hash)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ClientResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedisStorageType {
    Json,
    Hash,
}

impl RedisStorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisStorageType::Json => "JSON",
            RedisStorageType::Hash => "HASH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisVectorAlgorithm {
    Hnsw,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisDistanceMetric {
    Cosine,
    Ip,
    L2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisFieldKind {
    Tag,
    Text,
    Numeric,
    Vector {
        algorithm: RedisVectorAlgorithm,
        element_type: String,
        dimensions: usize,
        distance_metric: RedisDistanceMetric,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisIndexField {
    /// JSON 路径或 Hash 字段名
    pub path: String,
    pub alias: String,
    pub kind: RedisFieldKind,
}

/// FT.CREATE 请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisIndexDefinition {
    pub name: String,
    pub storage_type: RedisStorageType,
    pub prefixes: Vec<String>,
    pub fields: Vec<RedisIndexField>,
}

impl RedisIndexDefinition {
    /// 渲染为 FT.CREATE 的参数列表 (不含命令名)
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.name.clone(),
            "ON".to_string(),
            self.storage_type.as_str().to_string(),
        ];

        if !self.prefixes.is_empty() {
            args.push("PREFIX".to_string());
            args.push(self.prefixes.len().to_string());
            args.extend(self.prefixes.iter().cloned());
        }

        args.push("SCHEMA".to_string());
        for field in &self.fields {
            args.push(field.path.clone());
            if field.path != field.alias {
                args.push("AS".to_string());
                args.push(field.alias.clone());
            }
            match &field.kind {
                RedisFieldKind::Tag => args.push("TAG".to_string()),
                RedisFieldKind::Text => args.push("TEXT".to_string()),
                RedisFieldKind::Numeric => args.push("NUMERIC".to_string()),
                RedisFieldKind::Vector {
                    algorithm,
                    element_type,
                    dimensions,
                    distance_metric,
                } => {
                    args.push("VECTOR".to_string());
                    args.push(
                        match algorithm {
                            RedisVectorAlgorithm::Hnsw => "HNSW",
                            RedisVectorAlgorithm::Flat => "FLAT",
                        }
                        .to_string(),
                    );
                    args.push("6".to_string());
                    args.push("TYPE".to_string());
                    args.push(element_type.clone());
                    args.push("DIM".to_string());
                    args.push(dimensions.to_string());
                    args.push("DISTANCE_METRIC".to_string());
                    args.push(
                        match distance_metric {
                            RedisDistanceMetric::Cosine => "COSINE",
                            RedisDistanceMetric::Ip => "IP",
                            RedisDistanceMetric::L2 => "L2",
                        }
                        .to_string(),
                    );
                }
            }
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisIndexInfo {
    pub name: String,
    pub storage_type: RedisStorageType,
    pub num_docs: u64,
}

/// Hash 中的一个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub field: String,
    pub value: Vec<u8>,
}

impl HashEntry {
    pub fn new(field: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait RedisClient: Send + Sync {
    async fn ft_create(&self, definition: &RedisIndexDefinition) -> ClientResult<()>;

    /// 索引不存在时返回 `ClientError::NotFound`
    async fn ft_info(&self, index: &str) -> ClientResult<RedisIndexInfo>;

    async fn ft_dropindex(&self, index: &str) -> ClientResult<()>;

    async fn ft_list(&self) -> ClientResult<Vec<String>>;

    /// 返回实际删除的键数量
    async fn del(&self, keys: &[String]) -> ClientResult<u64>;
}

#[async_trait]
pub trait RedisJsonClient: RedisClient {
    /// `paths` 为 `None` 时返回整个文档，否则只返回指定的顶层字段
    async fn json_get(&self, key: &str, paths: Option<&[String]>) -> ClientResult<Option<Value>>;

    async fn json_mget(
        &self,
        keys: &[String],
        paths: Option<&[String]>,
    ) -> ClientResult<Vec<Option<Value>>>;

    async fn json_mset(&self, entries: &[(String, Value)]) -> ClientResult<()>;
}

#[async_trait]
pub trait RedisHashClient: RedisClient {
    /// `fields` 为 `None` 时等价于 HGETALL，否则等价于 HMGET (缺失字段不返回)
    async fn hget(&self, key: &str, fields: Option<&[String]>) -> ClientResult<Option<Vec<HashEntry>>>;

    /// 在一次 MULTI 事务中对每个键先 DEL 再 HSET，整体替换已有 Hash，
    /// 旧记录中本次未写入的字段不会保留
    async fn hset_multiple(&self, records: &[(String, Vec<HashEntry>)]) -> ClientResult<()>;
}
