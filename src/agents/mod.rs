//! Agent 装配：描述符、Agent 包装、委派工具与注册表

pub mod agent;
pub mod descriptor;
pub mod handoff;
pub mod plan;
pub mod registry;

pub use agent::{Agent, AgentInput, AgentRun, AgentSettings, InputContent};
pub use descriptor::{agent_dir, load, AgentConfig, AgentDescriptor};
pub use handoff::{handoff_tool_name, HandoffTool};
pub use plan::AgentPlan;
pub use registry::{AgentRegistry, AgentRegistryBuilder};
