//! 向量存储门面
//!
//! 按名称获取集合、创建与删除集合、列出集合名称。
//! 每个后端通过工厂类型参数决定集合的构造方式，调用方可以替换映射器或选项。

mod qdrant;
mod redis;
mod search;

pub use qdrant::*;
pub use redis::*;
pub use search::*;

use async_trait::async_trait;
use std::sync::Arc;

use vecbridge_core::Result;

use crate::collection::CollectionNames;
use crate::key::RecordKey;
use crate::schema::{RecordDefinition, VectorStoreRecord};
use crate::store::RecordCollection;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 只构造集合对象，不访问后端
    ///
    /// `definition` 为 `None` 时使用 `R::record_definition()` 的缓存模式。
    fn get_collection<K, R>(
        &self,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord;

    async fn create_collection<K, R>(
        &self,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        let collection = self.get_collection::<K, R>(name, definition)?;
        collection.create_collection().await?;
        Ok(collection)
    }

    async fn create_collection_if_not_exists<K, R>(
        &self,
        name: &str,
        definition: Option<&RecordDefinition>,
    ) -> Result<Arc<dyn RecordCollection<K, R>>>
    where
        K: RecordKey,
        R: VectorStoreRecord,
    {
        let collection = self.get_collection::<K, R>(name, definition)?;
        collection.create_collection_if_not_exists().await?;
        Ok(collection)
    }

    /// 删除不存在的集合不是错误
    async fn delete_collection(&self, name: &str) -> Result<()>;

    fn list_collection_names(&self) -> CollectionNames;
}
