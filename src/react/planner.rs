//! Planner：调用 LLM 与 Tool Call 解析
//!
//! 调用 LLM 得到回复或 JSON Tool Call；parse_llm_output 从文本中提取 JSON 并解析为 ToolCall 或直接回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::{tool_call_schema_json, ToolRegistry};

/// LLM 返回的 Tool Call（简化 JSON：{"tool": "manuals_tool", "args": {"machine_name": "..."}}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone)]
pub enum PlannerOutput {
    /// 直接回复用户
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出
///
/// ```json 代码块或裸 `{...}` 能解析成 tool 非空的 ToolCall 才算工具调用，
/// 其余一律按最终回复处理（手册内容本身可能带 JSON 代码块）。
pub fn parse_llm_output(output: &str) -> PlannerOutput {
    let trimmed = output.trim();

    let candidate = match trimmed.find("```json") {
        Some(start) => {
            let rest = &trimmed[start + 7..];
            rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
        }
        None => match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => return PlannerOutput::Response(trimmed.to_string()),
        },
    };

    match serde_json::from_str::<ToolCall>(candidate) {
        Ok(parsed) if !parsed.tool.is_empty() => PlannerOutput::ToolCall(parsed),
        Ok(_) => PlannerOutput::Response(trimmed.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "reply is not a tool call, treating as final answer");
            PlannerOutput::Response(trimmed.to_string())
        }
    }
}

/// system prompt = Agent 指令 + 可用工具 schema + 调用格式说明
pub fn build_system_prompt(instructions: &str, tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return instructions.trim().to_string();
    }
    format!(
        "{}\n\n## Available tools\n{}\n\nTo call a tool, reply with only a JSON object matching this schema:\n{}\nOtherwise reply with your final answer as plain text.",
        instructions.trim(),
        tools.to_schema_json(),
        tool_call_schema_json()
    )
}

/// Planner：持有 LLM 与 system prompt，plan 时拼 system + messages 后调用 LLM
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(messages);
        self.llm
            .complete(&full_messages)
            .await
            .map_err(AgentError::LlmError)
    }
}
