//! 认知层：Planner 与工具调用主循环

pub mod loop_;
pub mod planner;

pub use loop_::{run_agent_loop, LoopResult};
pub use planner::{build_system_prompt, parse_llm_output, Planner, PlannerOutput, ToolCall};
