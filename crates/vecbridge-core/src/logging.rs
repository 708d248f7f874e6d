//! 日志初始化

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{Result, VecBridgeError};

/// 构造过滤器：优先使用 RUST_LOG，否则使用配置中的级别
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// 初始化全局 tracing subscriber，重复调用返回错误
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| VecBridgeError::Config(format!("初始化日志失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            level: "vecbridge=debug,info".to_string(),
        };
        // 其他测试可能已经初始化过，这里只要求第二次一定失败
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
