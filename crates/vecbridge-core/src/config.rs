//! 配置管理
//!
//! 配置以 JSON 文件保存，缺失的字段使用默认值。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Result, VecBridgeError};

/// 主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 后端类型
    #[serde(default)]
    pub backend: VectorBackend,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    #[default]
    RedisJson,
    RedisHash,
    SearchIndex,
    Qdrant,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Redis 配置 (JSON 与 Hash 两种存储方式共用)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    /// 是否在物理键前加上 "{collection}:" 前缀
    #[serde(default)]
    pub prefix_collection_name_to_key_names: bool,
}

/// Qdrant 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// 集合是否使用命名向量；为 false 时每个点只有一个无名向量
    #[serde(default)]
    pub has_named_vectors: bool,
}

impl VectorStoreConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| VecBridgeError::Config(format!("读取配置失败: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| VecBridgeError::Config(format!("解析配置失败: {}", e)))?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| VecBridgeError::Config(format!("创建目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| VecBridgeError::Config(format!("序列化配置失败: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| VecBridgeError::Config(format!("写入配置失败: {}", e)))?;

        Ok(())
    }
}
