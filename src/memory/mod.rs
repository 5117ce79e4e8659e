//! 记忆层：消息类型与共享对话历史

pub mod conversation;

pub use conversation::{ContentPart, ImageUrl, Message, Role, SharedHistory};
