//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(tool_name, args) 在超时内调用 registry.execute，
//! 超时或失败时转为 AgentError（ToolTimeout / ToolExecutionFailed）；每次调用输出结构化审计日志（JSON）。
//! `Tool::timeout_exempt` 为 true 的工具（委派）不受超时限制。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::ToolRegistry;

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具；超时返回 ToolTimeout，工具返回 Err 则转为 ToolExecutionFailed；输出 JSON 审计日志
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let exempt = self
            .registry
            .get(tool_name)
            .map(|t| t.timeout_exempt())
            .unwrap_or(false);
        let call = self.registry.execute(tool_name, args);
        let result = if exempt {
            Ok(call.await)
        } else {
            timeout(self.timeout, call).await
        };

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.get(name).is_some()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::tools::Tool;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    /// 与 SlowTool 相同但声明不受超时限制
    struct SlowExemptTool;

    #[async_trait]
    impl Tool for SlowExemptTool {
        fn name(&self) -> &str {
            "slow_exempt"
        }

        fn description(&self) -> &str {
            "sleeps past the timeout"
        }

        fn timeout_exempt(&self) -> bool {
            true
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Ok("finished".to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("nope".to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SlowTool)).unwrap();
        let executor = ToolExecutor::new(registry, 1);
        let result = executor.execute("slow", Value::Null).await;
        assert!(matches!(result, Err(AgentError::ToolTimeout(_))));
    }

    #[tokio::test]
    async fn test_exempt_tool_outlives_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SlowExemptTool)).unwrap();
        let executor = ToolExecutor::new(registry, 1);
        assert_eq!(
            executor.execute("slow_exempt", Value::Null).await.unwrap(),
            "finished"
        );
    }

    #[tokio::test]
    async fn test_failure_mapped() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).unwrap();
        let executor = ToolExecutor::new(registry, 1);
        match executor.execute("failing", Value::Null).await {
            Err(AgentError::ToolExecutionFailed(msg)) => assert_eq!(msg, "nope"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
