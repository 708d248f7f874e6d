//! 后端网络客户端接口
//!
//! 实际的网络客户端不在本 crate 中实现，这里只定义存储层需要的能力。
//! 所有客户端都必须把 "不存在" 与其他传输错误区分开。

mod qdrant;
mod redis;
mod search;

pub use qdrant::*;
pub use redis::*;
pub use search::*;

use thiserror::Error;
use vecbridge_core::VecBridgeError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Transport(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// 包装为带操作上下文的存储层错误
    pub fn into_store_error(
        self,
        backend: &str,
        collection: &str,
        operation: &str,
    ) -> VecBridgeError {
        match self {
            ClientError::NotFound(message) => {
                VecBridgeError::NotFound(format!("{} ({}): {}", collection, operation, message))
            }
            ClientError::AlreadyExists(message) => {
                VecBridgeError::AlreadyExists(format!("{}: {}", collection, message))
            }
            ClientError::Transport(message) => VecBridgeError::Backend {
                backend: backend.to_string(),
                collection: collection.to_string(),
                operation: operation.to_string(),
                message,
            },
        }
    }
}
