//! Agent 包装：描述符 + LLM + 绑定的工具 + 共享会话历史
//!
//! invoke 读取历史快照，追加本轮 user 消息后运行工具调用循环，
//! 结束时把历史整体替换为 `历史 ++ 本轮消息`。system 消息只在发给模型时拼接，不进入历史。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::descriptor::{AgentConfig, AgentDescriptor};
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{ContentPart, Message, Role, SharedHistory};
use crate::react::{build_system_prompt, run_agent_loop, Planner};
use crate::tools::{ToolExecutor, ToolRegistry};

/// 单个 Agent 的运行参数
#[derive(Debug, Clone, Copy)]
pub struct AgentSettings {
    pub max_steps: usize,
    pub tool_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout_secs: 30,
        }
    }
}

/// 用户输入：纯文本或多模态内容片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// invoke 的输入；`{"input": ..., "machine_name": ...}` 或纯字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub input: InputContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
}

impl AgentInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: InputContent::Text(text.into()),
            machine_name: None,
        }
    }

    pub fn parts(parts: Vec<ContentPart>) -> Self {
        Self {
            input: InputContent::Parts(parts),
            machine_name: None,
        }
    }

    pub fn with_machine_name(mut self, machine_name: impl Into<String>) -> Self {
        self.machine_name = Some(machine_name.into());
        self
    }

    /// 转为本轮 user 消息；有 machine_name 时追加 `Machine: <name>`
    pub fn to_message(&self) -> Message {
        let machine = self
            .machine_name
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| format!("Machine: {}", m));

        match (&self.input, machine) {
            (InputContent::Text(text), None) => Message::user(text.clone()),
            (InputContent::Text(text), Some(m)) => Message::user(format!("{}\n\n{}", text, m)),
            (InputContent::Parts(parts), machine) => {
                let mut parts = parts.clone();
                if let Some(m) = machine {
                    parts.push(ContentPart::Text { text: m });
                }
                Message::user_parts(parts)
            }
        }
    }
}

impl From<&str> for AgentInput {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for AgentInput {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// 一次 invoke 的结果：最终文本 + 完整会话（历史 ++ 本轮）
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: String,
    pub messages: Vec<Message>,
}

impl AgentRun {
    /// 本次会话中所有工具输出（按出现顺序）
    pub fn tool_outputs(&self) -> Vec<&Message> {
        self.messages.iter().filter(|m| m.role == Role::Tool).collect()
    }
}

pub struct Agent {
    config: AgentConfig,
    planner: Planner,
    executor: ToolExecutor,
    history: SharedHistory,
    max_steps: usize,
}

impl Agent {
    /// tools 已包含解析出的命名工具与 handoff 工具
    pub fn new(
        descriptor: AgentDescriptor,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        history: SharedHistory,
        settings: AgentSettings,
    ) -> Self {
        let system_prompt = build_system_prompt(&descriptor.instructions, &tools);
        Self {
            config: descriptor.config,
            planner: Planner::new(llm, system_prompt),
            executor: ToolExecutor::new(tools, settings.tool_timeout_secs),
            history,
            max_steps: settings.max_steps,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    pub fn system_prompt(&self) -> &str {
        self.planner.system_prompt()
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.planner.token_usage()
    }

    pub async fn invoke(&self, input: impl Into<AgentInput>) -> Result<AgentRun, AgentError> {
        let input = input.into();
        let history = self.history.snapshot().await;
        tracing::info!(
            agent = %self.config.id,
            history_len = history.len(),
            machine_name = ?input.machine_name,
            "agent invoke"
        );

        let result = run_agent_loop(
            &self.planner,
            &self.executor,
            &history,
            input.to_message(),
            self.max_steps,
        )
        .await
        .map_err(|e| {
            tracing::warn!(agent = %self.config.id, error = %e, "agent run failed");
            e
        })?;

        let mut messages = history;
        messages.extend(result.new_messages);
        self.history.replace(messages.clone()).await;

        tracing::debug!(agent = %self.config.id, history_len = messages.len(), "agent run finished");
        Ok(AgentRun {
            output: result.response,
            messages,
        })
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.config.id)
            .field("model", &self.config.model)
            .field("tools", &self.executor.tool_names())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::ImageUrl;

    fn descriptor(id: &str) -> AgentDescriptor {
        AgentDescriptor {
            config: AgentConfig {
                id: id.to_string(),
                model: "test-model".to_string(),
                description: String::new(),
                tools: vec![],
                handover: vec![],
            },
            instructions: "Answer briefly.".to_string(),
        }
    }

    #[test]
    fn test_input_from_json() {
        let input: AgentInput =
            serde_json::from_value(serde_json::json!({"input": "hi", "machine_name": "m1"})).unwrap();
        assert_eq!(input.to_message().content, "hi\n\nMachine: m1");

        let input: AgentInput = serde_json::from_value(serde_json::json!({
            "input": [
                {"type": "text", "text": "what is this part?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ]
        }))
        .unwrap();
        let msg = input.to_message();
        assert_eq!(msg.parts.len(), 2);
        assert!(matches!(
            &msg.parts[1],
            ContentPart::ImageUrl { image_url: ImageUrl { url } } if url.starts_with("data:image/png")
        ));
    }

    #[test]
    fn test_blank_machine_name_ignored() {
        let msg = AgentInput::text("hi").with_machine_name("  ").to_message();
        assert_eq!(msg.content, "hi");
    }

    #[tokio::test]
    async fn test_invoke_appends_to_history() {
        let llm = Arc::new(ScriptedLlmClient::new(["first", "second"]));
        let history = SharedHistory::new();
        let agent = Agent::new(
            descriptor("a"),
            llm.clone(),
            ToolRegistry::new(),
            history.clone(),
            AgentSettings::default(),
        );

        let run = agent.invoke("one").await.unwrap();
        assert_eq!(run.output, "first");
        assert_eq!(run.messages.len(), 2);

        let before = history.snapshot().await;
        let run = agent.invoke("two").await.unwrap();
        assert_eq!(run.output, "second");
        assert_eq!(&run.messages[..before.len()], &before[..]);
        assert_eq!(history.len().await, 4);

        // system 只出现在发给模型的第一条，不进入历史
        let calls = llm.calls();
        assert_eq!(calls[1][0].role, Role::System);
        assert!(run.messages.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_failed_invoke_leaves_history_untouched() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push_error("connection reset");
        let history = SharedHistory::new();
        history.replace(vec![Message::user("earlier")]).await;
        let agent = Agent::new(
            descriptor("a"),
            llm,
            ToolRegistry::new(),
            history.clone(),
            AgentSettings::default(),
        );

        assert!(matches!(agent.invoke("x").await, Err(AgentError::LlmError(_))));
        assert_eq!(history.snapshot().await, vec![Message::user("earlier")]);
    }
}
