//! 工具调用主循环
//!
//! Plan -> (Tool Call -> Observation)* -> Response。模型自主决定是否调用工具；
//! 每次调用追加一条 Assistant（调用本身）和一条 Tool（工具输出）消息。
//! 模型调用失败直接上抛，不重试。

use crate::core::AgentError;
use crate::memory::Message;
use crate::react::planner::{parse_llm_output, Planner, PlannerOutput};
use crate::tools::ToolExecutor;

/// 单次运行结果：最终回复与本轮新增消息（不含 system 与历史）
#[derive(Debug, Clone)]
pub struct LoopResult {
    pub response: String,
    pub new_messages: Vec<Message>,
}

/// 运行工具调用循环
///
/// 发给模型的序列：system + history + user_message + 本轮已产生的调用/观察。
/// 工具执行失败以 `Error: ...` 作为观察写回，由模型决定后续；
/// 调用未绑定的工具为 HallucinatedTool；超过 max_steps 为 MaxStepsExceeded。
pub async fn run_agent_loop(
    planner: &Planner,
    executor: &ToolExecutor,
    history: &[Message],
    user_message: Message,
    max_steps: usize,
) -> Result<LoopResult, AgentError> {
    let mut new_messages = vec![user_message];

    for step in 0..max_steps {
        let mut messages = Vec::with_capacity(history.len() + new_messages.len());
        messages.extend_from_slice(history);
        messages.extend_from_slice(&new_messages);

        let output = planner.plan(&messages).await?;

        match parse_llm_output(&output) {
            PlannerOutput::Response(resp) => {
                tracing::debug!(step, "agent produced final response");
                new_messages.push(Message::assistant(resp.clone()));
                return Ok(LoopResult {
                    response: resp,
                    new_messages,
                });
            }
            PlannerOutput::ToolCall(tc) => {
                if !executor.has_tool(&tc.tool) {
                    tracing::warn!(tool = %tc.tool, available = ?executor.tool_names(), "model requested unbound tool");
                    return Err(AgentError::HallucinatedTool(tc.tool));
                }
                new_messages.push(Message::assistant(output.trim().to_string()));
                let observation = match executor.execute(&tc.tool, tc.args).await {
                    Ok(r) => r,
                    Err(e) => format!("Error: {}", e),
                };
                new_messages.push(Message::tool(tc.tool, observation));
            }
        }
    }

    Err(AgentError::MaxStepsExceeded(max_steps))
}
