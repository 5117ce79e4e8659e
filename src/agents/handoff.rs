//! 委派：把目标 Agent 包装成 `transfer_to_<id>` 工具
//!
//! 调用方 Agent 的模型发出 `{"tool": "transfer_to_manual_agent", "args": {"input": "..."}}`，
//! 目标 Agent 在同一份共享历史上运行，其最终回复作为观察返回给调用方。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::agents::agent::{Agent, AgentInput};
use crate::tools::{parameters_schema_for, Tool};

pub const HANDOFF_PREFIX: &str = "transfer_to_";

/// handoff 工具参数
#[allow(dead_code)]
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HandoffInput {
    /// 交给目标 Agent 的请求
    pub input: String,
    /// 相关机器名（可选）
    #[serde(default)]
    pub machine_name: Option<String>,
}

pub fn handoff_tool_name(agent_id: &str) -> String {
    format!("{}{}", HANDOFF_PREFIX, agent_id)
}

pub struct HandoffTool {
    name: String,
    description: String,
    target: Arc<Agent>,
}

impl HandoffTool {
    pub fn new(target: Arc<Agent>) -> Self {
        let name = handoff_tool_name(target.id());
        let description = if target.description().trim().is_empty() {
            format!("Transfer to {}", target.id())
        } else {
            target.description().to_string()
        };
        Self {
            name,
            description,
            target,
        }
    }

    pub fn target_id(&self) -> &str {
        self.target.id()
    }
}

/// 支持 `{"input": "...", "machine_name": "..."}` 与纯字符串
fn handoff_input(args: &Value) -> Result<AgentInput, String> {
    match args {
        Value::String(s) if !s.trim().is_empty() => Ok(AgentInput::text(s.clone())),
        Value::Object(map) => {
            let input = map
                .get("input")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| "Missing required argument 'input'".to_string())?;
            let mut agent_input = AgentInput::text(input);
            if let Some(machine) = map.get("machine_name").and_then(Value::as_str) {
                agent_input = agent_input.with_machine_name(machine);
            }
            Ok(agent_input)
        }
        _ => Err("Missing required argument 'input'".to_string()),
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<HandoffInput>()
    }

    /// 目标 Agent 的整段对话可能包含多轮模型调用，不套用单个工具的超时
    fn timeout_exempt(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let input = handoff_input(&args)?;
        tracing::info!(target_agent = %self.target.id(), "handoff");
        let run = self.target.invoke(input).await.map_err(|e| e.to_string())?;
        Ok(format!("Transferred to {}: {}", self.target.id(), run.output))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::agents::agent::AgentSettings;
    use crate::agents::descriptor::{AgentConfig, AgentDescriptor};
    use crate::llm::{LlmClient, ScriptedLlmClient};
    use crate::memory::{Message, SharedHistory};
    use crate::tools::ToolRegistry;

    fn descriptor(id: &str, description: &str) -> AgentDescriptor {
        AgentDescriptor {
            config: AgentConfig {
                id: id.to_string(),
                model: "m".to_string(),
                description: description.to_string(),
                tools: vec![],
                handover: vec![],
            },
            instructions: "Look up manuals.".to_string(),
        }
    }

    fn target(description: &str, replies: &[&str]) -> Arc<Agent> {
        Arc::new(Agent::new(
            descriptor("manual_agent", description),
            Arc::new(ScriptedLlmClient::new(replies.iter().copied())),
            ToolRegistry::new(),
            SharedHistory::new(),
            AgentSettings::default(),
        ))
    }

    /// 每次回复前先等待，模拟较慢的模型
    struct SlowLlm {
        delay: Duration,
        reply: &'static str,
    }

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn test_name_and_description() {
        let tool = HandoffTool::new(target("", &[]));
        assert_eq!(tool.name(), "transfer_to_manual_agent");
        assert_eq!(tool.description(), "Transfer to manual_agent");

        let tool = HandoffTool::new(target("Answers from machine manuals", &[]));
        assert_eq!(tool.description(), "Answers from machine manuals");
    }

    #[tokio::test]
    async fn test_execute_invokes_target() {
        let tool = HandoffTool::new(target("", &["Step 1 is calibration"]));
        let out = tool
            .execute(serde_json::json!({"input": "how do I start machine001?"}))
            .await
            .unwrap();
        assert_eq!(out, "Transferred to manual_agent: Step 1 is calibration");
    }

    #[tokio::test]
    async fn test_string_args_and_missing_input() {
        let tool = HandoffTool::new(target("", &["ok"]));
        assert!(tool.execute(serde_json::json!("plain request")).await.is_ok());
        assert!(tool.execute(serde_json::json!({})).await.is_err());
        assert!(tool.execute(serde_json::json!(42)).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_delegate_is_not_cut_by_tool_timeout() {
        let settings = AgentSettings {
            max_steps: 5,
            tool_timeout_secs: 1,
        };
        let history = SharedHistory::new();
        let delegate = Arc::new(Agent::new(
            descriptor("manual_agent", "Machine manuals"),
            Arc::new(SlowLlm {
                delay: Duration::from_millis(1500),
                reply: "Step 1 text",
            }),
            ToolRegistry::new(),
            history.clone(),
            settings,
        ));
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(HandoffTool::new(delegate))).unwrap();
        let dispatcher = Agent::new(
            descriptor("dispatcher_agent", ""),
            Arc::new(ScriptedLlmClient::new([
                r#"{"tool": "transfer_to_manual_agent", "args": {"input": "start-up steps?"}}"#,
                "done",
            ])),
            tools,
            history,
            settings,
        );

        let run = dispatcher.invoke("start-up steps?").await.unwrap();
        assert_eq!(
            run.tool_outputs()[0].content,
            "Transferred to manual_agent: Step 1 text"
        );
        assert_eq!(run.output, "done");
    }
}
