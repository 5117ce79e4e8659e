//! HTTP 入口：`POST /api/conversationRun`、`GET /api/health`
//!
//! 请求体手动解析（而非 Json extractor），以便非法 JSON / 缺少 input 返回固定的 400 文本。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::{AgentInput, AgentRegistry, InputContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Invalid input")]
    InvalidInput,
}

#[derive(Clone)]
pub struct HttpState {
    registry: Arc<AgentRegistry>,
    entry_agent: String,
}

impl HttpState {
    pub fn new(registry: Arc<AgentRegistry>, entry_agent: impl Into<String>) -> Self {
        Self {
            registry,
            entry_agent: entry_agent.into(),
        }
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/conversationRun", post(conversation_run))
        .route("/api/health", get(|| async { "ok" }))
        .with_state(state)
}

/// 请求体：JSON 对象，`input` 为字符串或内容片段数组，可选 `machine_name`
pub fn parse_conversation_request(body: &[u8]) -> Result<AgentInput, RequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidJson)?;
    let Value::Object(map) = value else {
        return Err(RequestError::InvalidJson);
    };

    let input = match map.get("input") {
        Some(Value::String(text)) => InputContent::Text(text.clone()),
        Some(parts @ Value::Array(_)) => InputContent::Parts(
            serde_json::from_value(parts.clone()).map_err(|_| RequestError::InvalidInput)?,
        ),
        _ => return Err(RequestError::InvalidInput),
    };
    let machine_name = map
        .get("machine_name")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(AgentInput {
        input,
        machine_name,
    })
}

async fn conversation_run(State(state): State<HttpState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, agent = %state.entry_agent, "HTTP conversationRun invoked");

    let input = match parse_conversation_request(&body) {
        Ok(input) => input,
        Err(e) => {
            tracing::debug!(%request_id, error = %e, "rejected conversationRun request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    tracing::debug!(%request_id, input = ?input, "conversationRun input");

    let result = match state.registry.get_or_create(&state.entry_agent).await {
        Ok(agent) => agent.invoke(input).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(run) => (StatusCode::OK, Json(serde_json::json!({ "output": run.output }))).into_response(),
        Err(e) => {
            tracing::error!(%request_id, agent = %state.entry_agent, error = %e, "conversationRun failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
