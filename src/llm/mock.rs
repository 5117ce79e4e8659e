//! Scripted LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序返回预置回复，并记录每次调用收到的消息序列；回复用完后回显最后一条 User 消息。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::{LlmClient, LlmFactory};
use crate::memory::{Message, Role};

/// Scripted 客户端：预置回复队列 + 调用记录
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一次失败回复（模拟模型调用失败）
    pub fn push_error(&self, error: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error.into()));
        }
    }

    /// 已收到的调用（每次调用的完整消息序列）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front();
        match next {
            Some(reply) => reply,
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(format!("Echo from Mock: {}", last_user))
            }
        }
    }
}

/// 所有 model 名都返回同一个 ScriptedLlmClient（测试注入用）
#[derive(Clone)]
pub struct ScriptedLlmFactory {
    client: Arc<ScriptedLlmClient>,
}

impl ScriptedLlmFactory {
    pub fn new(client: Arc<ScriptedLlmClient>) -> Self {
        Self { client }
    }
}

impl LlmFactory for ScriptedLlmFactory {
    fn create(&self, _model: &str) -> Result<Arc<dyn LlmClient>, AgentError> {
        Ok(self.client.clone())
    }
}
