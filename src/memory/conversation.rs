//! 对话消息与共享对话历史
//!
//! SharedHistory 由调用方显式持有并注入 AgentRegistry，所有 Agent 共用同一份历史：
//! invoke 开始时读取（拼在新输入之前），结束时整体替换为本轮运行后的消息序列。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 消息角色（与 LLM API 一致，Tool 为工具输出）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// 多模态输入片段（HTTP 入口的 input 数组元素）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    /// 纯文本渲染：文本原样，图片写成 `[image] <url>`
    pub fn render(&self) -> String {
        match self {
            ContentPart::Text { text } => text.clone(),
            ContentPart::ImageUrl { image_url } => format!("[image] {}", image_url.url),
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool 消息对应的工具名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 原始多模态片段（仅 User 消息可能携带）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<ContentPart>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            name: None,
            parts: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// 多模态用户消息：content 为各片段的文本渲染（换行拼接）
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        let content = parts
            .iter()
            .map(ContentPart::render)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            parts,
            ..Self::with_role(Role::User, content)
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::with_role(Role::Tool, content.into())
        }
    }
}

/// 进程内共享的对话历史句柄（Clone 后指向同一份数据）
///
/// 并发 invoke 会交错写入，这里只保证单次读 / 写的原子性，不保证会话隔离。
#[derive(Clone, Debug, Default)]
pub struct SharedHistory {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl SharedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn replace(&self, messages: Vec<Message>) {
        *self.messages.write().await = messages;
    }

    pub async fn reset(&self) {
        self.messages.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}
