//! 集合管理：创建、删除、检查、列出，并把向量属性翻译为后端索引配置

mod qdrant;
mod redis;
mod search;

pub use qdrant::*;
pub use redis::*;
pub use search::*;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::future::Future;

use vecbridge_core::{Result, VecBridgeError};

use crate::schema::{RecordSchema, VectorProperty};

/// 集合名称流：一次后端往返的结果，有限且不可重启
pub type CollectionNames = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait CollectionManager: Send + Sync {
    fn backend(&self) -> &'static str;

    /// 本身不是幂等的，集合已存在时返回 `AlreadyExists`
    async fn create_collection(&self, name: &str, schema: &RecordSchema) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// 删除不存在的集合不是错误
    async fn delete_collection(&self, name: &str) -> Result<()>;

    fn list_collection_names(&self) -> CollectionNames;

    /// 先检查再创建；两者之间的竞争导致的 "已存在" 视为成功
    async fn create_collection_if_not_exists(&self, name: &str, schema: &RecordSchema) -> Result<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }

        match self.create_collection(name, schema).await {
            Err(e) if e.is_already_exists() => {
                tracing::warn!(
                    "Collection {} on {} was created concurrently: {}",
                    name,
                    self.backend(),
                    e
                );
                Ok(())
            }
            other => other,
        }
    }
}

/// 把一次返回全部名称的调用包装为惰性流，首次轮询时才发起请求
pub(crate) fn lazy_names<F>(request: F) -> CollectionNames
where
    F: Future<Output = Result<Vec<String>>> + Send + 'static,
{
    stream::once(request)
        .map_ok(|names| stream::iter(names.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
}

pub(crate) fn require_dimensions(property: &VectorProperty) -> Result<usize> {
    match property.dimensions {
        Some(dimensions) if dimensions > 0 => Ok(dimensions),
        _ => Err(VecBridgeError::Config(format!(
            "创建集合需要向量属性 '{}' 的维度",
            property.name
        ))),
    }
}
