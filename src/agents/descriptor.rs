//! Agent 描述符加载
//!
//! 每个 Agent 一个目录：`config.json`（id / model / description / tools / handover）+ `instructions.md`（system prompt）。
//! 配置只在构建 Agent 时读取一次，不做热更新。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

pub const CONFIG_FILE: &str = "config.json";
pub const INSTRUCTIONS_FILE: &str = "instructions.md";

/// config.json 内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    #[serde(default)]
    pub model: String,
    /// 作为 handoff 工具暴露给其他 Agent 时的描述
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, alias = "sub_agents")]
    pub handover: Vec<String>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.id.trim().is_empty() {
            return Err(AgentError::ConfigError("id must be specified in config".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::ConfigError(format!(
                "model must be specified in config (agent {})",
                self.id
            )));
        }
        Ok(())
    }
}

/// 描述符 + 指令文本（纯数据，构建前的第一阶段产物）
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDescriptor {
    pub config: AgentConfig,
    pub instructions: String,
}

impl AgentDescriptor {
    /// 从 `<root>/<agent_id>/` 读取；目录不存在为 UnknownAgent，id 不一致为 ConfigError
    pub fn load_dir(root: &Path, agent_id: &str) -> Result<Self, AgentError> {
        let dir = agent_dir(root, agent_id);
        if !dir.is_dir() {
            return Err(AgentError::UnknownAgent(agent_id.to_string()));
        }
        let (config, instructions) = load(dir.join(CONFIG_FILE), dir.join(INSTRUCTIONS_FILE))?;
        if config.id != agent_id {
            return Err(AgentError::ConfigError(format!(
                "{} declares id {} but lives in directory {}",
                dir.join(CONFIG_FILE).display(),
                config.id,
                agent_id
            )));
        }
        Ok(Self {
            config,
            instructions,
        })
    }
}

/// Agent 目录命名约定：`<root>/<agent_id>`
pub fn agent_dir(root: &Path, agent_id: &str) -> PathBuf {
    root.join(agent_id)
}

/// 读取描述符与指令；文件缺失、JSON 非法、缺少 id / model 均为 ConfigError
pub fn load(
    config_path: impl AsRef<Path>,
    instructions_path: impl AsRef<Path>,
) -> Result<(AgentConfig, String), AgentError> {
    let config_path = config_path.as_ref();
    let instructions_path = instructions_path.as_ref();

    let raw = std::fs::read_to_string(config_path).map_err(|e| {
        AgentError::ConfigError(format!("cannot read {}: {}", config_path.display(), e))
    })?;
    let config: AgentConfig = serde_json::from_str(&raw).map_err(|e| {
        AgentError::ConfigError(format!("invalid {}: {}", config_path.display(), e))
    })?;
    config.validate()?;

    let instructions = std::fs::read_to_string(instructions_path).map_err(|e| {
        AgentError::ConfigError(format!("cannot read {}: {}", instructions_path.display(), e))
    })?;

    tracing::debug!(agent = %config.id, model = %config.model, tools = ?config.tools, "agent descriptor loaded");
    Ok((config, instructions))
}
