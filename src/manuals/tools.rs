//! 手册工具：manuals_tool（取单本）、fetch_manuals（列出）、manual_markdown_lookup（拼接到用户消息）
//!
//! 模型给出的参数形态不一，machine_name_from_args 统一成一个机器名，非法时在 I/O 前报 InvalidArgument。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::manuals::library::ManualLibrary;
use crate::tools::schema::parameters_schema_for;
use crate::tools::Tool;

/// manuals_tool 参数
#[allow(dead_code)]
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ManualToolInput {
    /// Name of the machine without extension
    pub machine_name: String,
}

/// manual_markdown_lookup 参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ManualMarkdownInput {
    /// Name of the machine without extension
    pub machine_name: String,
    /// Original user message to append context to
    pub user_message: String,
}

/// 从工具参数中取机器名，接受以下形态：
///
/// - `"machine001"`（单个位置参数）
/// - `["machine001"]`
/// - `{"machine_name": "machine001"}`（命名参数）
/// - `{"tool_input": {"machine_name": "machine001"}}` / `{"tool_input": "machine001"}`（结构化输入）
pub fn machine_name_from_args(args: &Value) -> Result<String, AgentError> {
    let name = match args {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) if items.len() == 1 => items[0].as_str(),
        Value::Object(map) => match (map.get("machine_name"), map.get("tool_input")) {
            (Some(v), _) => v.as_str(),
            (None, Some(Value::String(s))) => Some(s.as_str()),
            (None, Some(Value::Object(inner))) => {
                inner.get("machine_name").and_then(Value::as_str)
            }
            _ => None,
        },
        _ => None,
    };
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => Ok(n.to_string()),
        _ => Err(AgentError::InvalidArgument(
            "Missing required argument 'machine_name'".to_string(),
        )),
    }
}

/// 取指定机器的 Markdown 手册
pub struct ManualsTool {
    name: String,
    library: Arc<ManualLibrary>,
}

impl ManualsTool {
    pub const NAME: &'static str = "manuals_tool";

    pub fn new(library: Arc<ManualLibrary>) -> Self {
        Self::named(Self::NAME, library)
    }

    /// 以别名注册（如 manuals_tools）
    pub fn named(name: impl Into<String>, library: Arc<ManualLibrary>) -> Self {
        Self {
            name: name.into(),
            library,
        }
    }

    /// 任意调用形态 → 手册文本
    pub async fn run(&self, args: &Value) -> Result<String, AgentError> {
        let machine_name = machine_name_from_args(args)?;
        self.library.fetch(&machine_name).await
    }
}

#[async_trait]
impl Tool for ManualsTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Fetch a specific machine manual in markdown format. Args: {\"machine_name\": \"machine id\"}"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<ManualToolInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        tracing::info!(args = %args, "manuals tool execute");
        self.run(&args).await.map_err(|e| e.to_string())
    }
}

/// 列出容器（或本地目录）中的手册名
pub struct FetchManualsTool {
    library: Arc<ManualLibrary>,
}

impl FetchManualsTool {
    pub const NAME: &'static str = "fetch_manuals";

    pub fn new(library: Arc<ManualLibrary>) -> Self {
        Self { library }
    }

    pub async fn list(&self) -> Vec<String> {
        self.library.list().await
    }
}

#[async_trait]
impl Tool for FetchManualsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "List the names of manuals stored in the container. No args."
    }

    /// 参数一律忽略
    async fn execute(&self, _args: Value) -> Result<String, String> {
        Ok(self.list().await.join("\n"))
    }
}

/// 取手册并拼接到用户消息之后；未找到时原样返回用户消息
pub struct ManualMarkdownTool {
    library: Arc<ManualLibrary>,
}

impl ManualMarkdownTool {
    pub const NAME: &'static str = "manual_markdown_lookup";

    pub fn new(library: Arc<ManualLibrary>) -> Self {
        Self { library }
    }

    pub async fn run(&self, input: ManualMarkdownInput) -> Result<String, AgentError> {
        let key = crate::manuals::normalize_key(&input.machine_name)?;
        let text = self.library.fetch(&key).await?;
        if text == crate::manuals::not_found_message(&key) {
            Ok(input.user_message)
        } else {
            Ok(format!("{}\n\n{}", input.user_message, text))
        }
    }
}

#[async_trait]
impl Tool for ManualMarkdownTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Append the markdown manual for a machine to the provided user message. Args: {\"machine_name\": \"...\", \"user_message\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<ManualMarkdownInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let input: ManualMarkdownInput = serde_json::from_value(args)
            .map_err(|e| AgentError::InvalidArgument(e.to_string()).to_string())?;
        self.run(input).await.map_err(|e| e.to_string())
    }
}
