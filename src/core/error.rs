//! Agent 错误类型
//!
//! 配置、工具解析属于装配错误（fail-fast）；模型调用失败原样上抛；
//! 手册检索的来源失败不在这里出现（由 ManualLibrary 记录日志后降级）。

use thiserror::Error;

/// Agent 装配与运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Tool {0} not found in tool catalog")]
    ToolNotFound(String),

    #[error("Tool {0} registered more than once")]
    DuplicateTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型请求了该 Agent 未绑定的工具
    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Max steps exceeded ({0})")]
    MaxStepsExceeded(usize),
}
