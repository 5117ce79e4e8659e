//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `OPS__*` 覆盖（双下划线表示嵌套，如 `OPS__LLM__PROVIDER=openai`）。
//! 手册存储还兼容旧变量 `MANUALS_MD_CONNECTION_STRING` / `MANUALS_MD_PATH` / `MANUALS_MD_CONTAINER`。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub manuals: ManualsSection,
    pub functions: FunctionsSection,
}

/// [app] 段：Agent 描述符目录、单次调用最大工具轮数
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 每个 Agent 一个子目录：`<agents_dir>/<id>/config.json` + `instructions.md`
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

fn default_max_steps() -> usize {
    10
}

/// [llm] 段：后端选择（openai / mock）与端点
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [manuals] 段：Blob 连接串、容器名、本地回退目录
#[derive(Debug, Clone, Deserialize)]
pub struct ManualsSection {
    pub connection_string: Option<String>,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_fallback_path")]
    pub fallback_path: PathBuf,
}

impl Default for ManualsSection {
    fn default() -> Self {
        Self {
            connection_string: None,
            container: default_container(),
            fallback_path: default_fallback_path(),
        }
    }
}

fn default_container() -> String {
    "manuals-md".to_string()
}

fn default_fallback_path() -> PathBuf {
    PathBuf::from("manuals-md")
}

impl ManualsSection {
    /// 用旧环境变量覆盖（空字符串视为未配置连接串）
    pub fn apply_legacy_env(&mut self) {
        if let Ok(cs) = std::env::var("MANUALS_MD_CONNECTION_STRING") {
            self.connection_string = Some(cs);
        }
        if let Ok(path) = std::env::var("MANUALS_MD_PATH") {
            self.fallback_path = PathBuf::from(path);
        }
        if let Ok(container) = std::env::var("MANUALS_MD_CONTAINER") {
            self.container = container;
        }
        if self
            .connection_string
            .as_deref()
            .is_some_and(|cs| cs.trim().is_empty())
        {
            self.connection_string = None;
        }
    }
}

/// [functions] 段：HTTP 监听地址、入口 Agent、定时清理周期
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionsSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_entry_agent")]
    pub entry_agent: String,
    #[serde(default = "default_timer_interval_secs")]
    pub timer_interval_secs: u64,
}

impl Default for FunctionsSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            entry_agent: default_entry_agent(),
            timer_interval_secs: default_timer_interval_secs(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:7071".to_string()
}

fn default_entry_agent() -> String {
    "manual_agent".to_string()
}

fn default_timer_interval_secs() -> u64 {
    300
}

/// 从 config 目录加载配置，环境变量 OPS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 OPS__*（双下划线表示嵌套键）
/// 4. 最后应用 MANUALS_MD_* 旧变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("OPS")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.manuals.apply_legacy_env();
    Ok(cfg)
}
