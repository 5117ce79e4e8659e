//! 队列消息处理（`tasks` 队列）：UTF-8 JSON，记录顶层键
//!
//! 本服务不监听队列；这是外部触发宿主（队列触发器）调用的处理函数体。

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("message is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// 已处理消息的回执；非对象负载的 keys 为空
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueReceipt {
    pub keys: Vec<String>,
}

pub fn process_queue_message(body: &[u8]) -> Result<QueueReceipt, QueueError> {
    let result = decode(body);
    if let Err(e) = &result {
        tracing::error!(error = %e, "Failed to process queue message");
    }
    result
}

fn decode(body: &[u8]) -> Result<QueueReceipt, QueueError> {
    let text = std::str::from_utf8(body)?;
    tracing::info!(message = %text, "Queue message");
    let payload: Value = serde_json::from_str(text)?;
    let keys: Vec<String> = match &payload {
        Value::Object(map) => map.keys().cloned().collect(),
        other => {
            tracing::info!(kind = json_kind(other), "Processed non-object payload");
            return Ok(QueueReceipt { keys: Vec::new() });
        }
    };
    tracing::info!(keys = ?keys, "Processed payload keys");
    Ok(QueueReceipt { keys })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
