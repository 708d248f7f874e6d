//! VecBridge Core - 核心类型和抽象
//!
//! 提供统一错误类型、配置加载与日志初始化。

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;
