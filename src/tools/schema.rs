//! 工具调用 JSON Schema 生成（schemars）
//!
//! tool_call_schema_json 注入 system prompt，减少 LLM 输出格式错误；
//! parameters_schema_for 为带参数的工具生成参数 schema。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 工具调用请求格式：与 Planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 manuals_tool、fetch_manuals、transfer_to_manual_agent
    pub tool: String,
    /// 工具参数，依工具不同而不同（machine_name、input 等）
    pub args: HashMap<String, String>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 参数类型 T 的 JSON Schema
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}
