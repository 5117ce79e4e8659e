//! ops-agents：LLM 智能体装配与手册检索
//!
//! 模块划分：
//! - **agents**: Agent 描述符加载、Agent 包装、委派工具、两阶段注册表
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **functions**: 入口（HTTP 会话、定时清理、队列消息、文档变更流）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Scripted）
//! - **manuals**: 机器手册检索（Blob 存储 + 本地目录回退）与手册工具
//! - **memory**: 消息类型与共享对话历史
//! - **react**: Planner 与工具调用主循环
//! - **tools**: 工具 trait、注册表、执行器与工具目录

pub mod agents;
pub mod config;
pub mod core;
pub mod functions;
pub mod llm;
pub mod manuals;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use agents::{Agent, AgentInput, AgentRegistry, AgentRun};
pub use core::AgentError;
pub use memory::SharedHistory;
