//! 统一错误处理

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VecBridgeError {
    /// 记录声明本身有误：没有键、多个键、向量类型无法解析等
    #[error("模式错误: {0}")]
    Schema(String),

    /// 目标后端无法表示模式中声明的类型
    #[error("类型不支持: {0}")]
    UnsupportedType(String),

    #[error("配置错误: {0}")]
    Config(String),

    /// 存储载荷与模式不匹配
    #[error("映射错误: {0}")]
    Mapping(String),

    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("集合已存在: {0}")]
    AlreadyExists(String),

    #[error("后端错误 [{backend}] {operation} ({collection}): {message}")]
    Backend {
        backend: String,
        collection: String,
        operation: String,
        message: String,
    },

    #[error("操作已取消")]
    Cancelled,

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VecBridgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VecBridgeError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, VecBridgeError::AlreadyExists(_))
    }
}

pub type Result<T> = std::result::Result<T, VecBridgeError>;
