//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Scripted）

pub mod factory;
pub mod mock;
pub mod openai;
pub mod traits;

pub use factory::ConfiguredLlmFactory;
pub use mock::{ScriptedLlmClient, ScriptedLlmFactory};
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmFactory};
