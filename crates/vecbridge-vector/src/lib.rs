//! VecBridge Vector - 向量记录映射与集合管理
//!
//! 把带有模式声明的 Rust 记录映射到多种存储后端：
//! - Redis JSON (RedisJSON + RediSearch)
//! - Redis Hash (Hash + RediSearch)
//! - 搜索索引服务 (文档 + 向量字段)
//! - Qdrant (点 + payload)
//!
//! 后端客户端以 trait 形式注入，本 crate 不直接依赖任何网络客户端。

pub mod cancel;
pub mod client;
pub mod collection;
pub mod key;
pub mod mapper;
pub mod schema;
pub mod store;
pub mod vector_store;

pub use cancel::*;
pub use client::*;
pub use collection::*;
pub use key::*;
pub use mapper::*;
pub use schema::*;
pub use store::*;
pub use vector_store::*;

#[cfg(test)]
mod test_support;
