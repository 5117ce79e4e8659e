//! 按配置选择 LLM 后端（OpenAI 兼容 / Mock）

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::AgentError;
use crate::llm::{LlmClient, LlmFactory, OpenAiClient, ScriptedLlmClient};

/// 根据 [llm] 段与环境变量创建客户端：有 API Key 且 provider 为 openai 时走 OpenAI 兼容端点，否则用 Mock
pub struct ConfiguredLlmFactory {
    section: LlmSection,
}

impl ConfiguredLlmFactory {
    pub fn new(section: LlmSection) -> Self {
        Self { section }
    }
}

impl LlmFactory for ConfiguredLlmFactory {
    fn create(&self, model: &str) -> Result<Arc<dyn LlmClient>, AgentError> {
        if model.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "model must be specified in config".to_string(),
            ));
        }
        let provider = self.section.provider.to_lowercase();
        let api_key = std::env::var(&self.section.api_key_env).ok();
        match (provider.as_str(), api_key) {
            ("openai", Some(key)) => {
                tracing::info!(model = %model, "Using OpenAI-compatible LLM");
                Ok(Arc::new(OpenAiClient::new(
                    self.section.base_url.as_deref(),
                    model,
                    &key,
                )))
            }
            ("openai", None) | ("mock", _) => {
                tracing::warn!(model = %model, "No API key set or provider is mock, using Mock LLM");
                Ok(Arc::new(ScriptedLlmClient::default()))
            }
            (other, _) => Err(AgentError::ConfigError(format!(
                "unknown llm provider: {}",
                other
            ))),
        }
    }
}
