//! 可观测性：tracing 订阅器初始化
//!
//! 默认 `info`，`RUST_LOG` 覆盖（如 `RUST_LOG=ops_agents=debug`）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_DIRECTIVE: &str = "info";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 安装全局订阅器；重复调用（如测试中）返回错误而不是 panic
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .try_init()
}
