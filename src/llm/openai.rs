//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url，含 Azure OpenAI v1 端点、自建代理等）。
//! Tool 消息以 `Observation from <tool>: ...` 的 User 消息发送，与 Planner 的 JSON Tool Call 协议配套。

use std::sync::atomic::{AtomicU64, Ordering};

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// 累计 token：(prompt, completion)
#[derive(Debug, Default)]
struct Usage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

/// 绑定单个 model 的客户端，API Key 由 LlmFactory 从环境变量读取后传入
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    usage: Usage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key.to_string());
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: Usage::default(),
        }
    }
}

fn user_text(content: String) -> Result<ChatCompletionRequestMessage, String> {
    Ok(ChatCompletionRequestMessage::User(
        ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| e.to_string())?,
    ))
}

fn to_request_message(m: &Message) -> Result<ChatCompletionRequestMessage, String> {
    match m.role {
        Role::System => Ok(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(|e| e.to_string())?,
        )),
        Role::User => user_text(m.content.clone()),
        Role::Assistant => Ok(ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(m.content.clone())
                .build()
                .map_err(|e| e.to_string())?,
        )),
        Role::Tool => user_text(format!(
            "Observation from {}: {}",
            m.name.as_deref().unwrap_or("tool"),
            m.content
        )),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        let prompt = self.usage.prompt.load(Ordering::Relaxed);
        let completion = self.usage.completion.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(usage) = &response.usage {
            self.usage
                .prompt
                .fetch_add(usage.prompt_tokens as u64, Ordering::Relaxed);
            self.usage
                .completion
                .fetch_add(usage.completion_tokens as u64, Ordering::Relaxed);
        }
        tracing::debug!(model = %self.model, "chat completion received");

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}
