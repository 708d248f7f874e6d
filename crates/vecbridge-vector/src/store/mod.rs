//! 记录集合：统一的 CRUD 接口与各后端实现

mod qdrant;
mod redis_hash;
mod redis_json;
mod search;

pub use qdrant::*;
pub use redis_hash::*;
pub use redis_json::*;
pub use search::*;

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

use vecbridge_core::{Result, VecBridgeError};

use crate::collection::CollectionManager;
use crate::key::RecordKey;
use crate::mapper::GetRecordOptions;
use crate::schema::{RecordSchema, VectorStoreRecord};

/// 一个绑定到后端的命名集合
///
/// 同名同后端的两个实例可以互换使用。实例可被多个调用方并发使用，
/// 调用之间唯一共享的状态是不可变的模式。
#[async_trait]
pub trait RecordCollection<K: RecordKey, R: VectorStoreRecord>: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &Arc<RecordSchema>;

    async fn collection_exists(&self) -> Result<bool>;

    async fn create_collection(&self) -> Result<()>;

    async fn create_collection_if_not_exists(&self) -> Result<()>;

    async fn delete_collection(&self) -> Result<()>;

    /// 键不存在时返回 `NotFound`
    async fn get(&self, key: &K, options: GetRecordOptions) -> Result<R>;

    /// 按输入顺序返回；任何一个键不存在都会使整个批次失败
    async fn get_batch(&self, keys: &[K], options: GetRecordOptions) -> Result<Vec<R>>;

    /// 逐键读取，不存在的键返回 `None`，其他错误仍使整个批次失败
    async fn get_batch_partial(&self, keys: &[K], options: GetRecordOptions) -> Result<Vec<Option<R>>> {
        try_join_all(keys.iter().map(|key| async move {
            match self.get(key, options).await {
                Ok(record) => Ok(Some(record)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            }
        }))
        .await
    }

    /// 覆盖同键的已有记录，返回记录的键
    async fn upsert(&self, record: &R) -> Result<K>;

    /// 单次多键写入，失败时整个批次返回一个错误
    async fn upsert_batch(&self, records: &[R]) -> Result<Vec<K>>;

    /// 删除不存在的键不是错误
    async fn delete(&self, key: &K) -> Result<()>;

    async fn delete_batch(&self, keys: &[K]) -> Result<()>;
}

/// 各后端集合共有的部分：名称、模式与集合管理器
pub(crate) struct CollectionCore<M> {
    pub name: String,
    pub schema: Arc<RecordSchema>,
    pub manager: M,
}

impl<M: CollectionManager> CollectionCore<M> {
    pub async fn exists(&self) -> Result<bool> {
        self.manager.collection_exists(&self.name).await
    }

    pub async fn create(&self) -> Result<()> {
        self.manager.create_collection(&self.name, &self.schema).await
    }

    pub async fn create_if_not_exists(&self) -> Result<()> {
        self.manager
            .create_collection_if_not_exists(&self.name, &self.schema)
            .await
    }

    pub async fn delete(&self) -> Result<()> {
        self.manager.delete_collection(&self.name).await
    }

    pub fn not_found(&self, key: &str) -> VecBridgeError {
        VecBridgeError::NotFound(format!("集合 {} 中不存在键 {}", self.name, key))
    }
}

/// 字符串键后端使用：取出键的字符串形式
pub(crate) fn string_key<K: RecordKey>(key: &K) -> Result<String> {
    match key.to_value() {
        serde_json::Value::String(key) => Ok(key),
        other => Err(VecBridgeError::UnsupportedType(format!(
            "该后端只支持字符串键，实际为 {}",
            other
        ))),
    }
}
