//! ops-agents HTTP 服务
//!
//! 入口：加载配置、初始化日志、构建 Agent 注册表，启动定时清理并在 bind_addr 上提供 HTTP 接口。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ops_agents::{
    agents::AgentRegistry,
    config::load_config,
    functions::{router, shutdown_on_ctrl_c, spawn_timer_cleanup, HttpState},
    llm::ConfiguredLlmFactory,
    memory::SharedHistory,
    observability,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init().context("Failed to install tracing subscriber")?;

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;

    let factory = Arc::new(ConfiguredLlmFactory::new(cfg.llm.clone()));
    let registry = Arc::new(AgentRegistry::from_config(&cfg, factory, SharedHistory::new()));

    // 启动时构建入口 Agent，配置错误直接退出
    registry
        .get_or_create(&cfg.functions.entry_agent)
        .await
        .with_context(|| format!("Failed to build agent {}", cfg.functions.entry_agent))?;

    let cancel = CancellationToken::new();
    let timer = spawn_timer_cleanup(
        Duration::from_secs(cfg.functions.timer_interval_secs.max(1)),
        cancel.clone(),
    );

    let app = router(HttpState::new(registry, cfg.functions.entry_agent.clone()));
    let listener = tokio::net::TcpListener::bind(&cfg.functions.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.functions.bind_addr))?;
    tracing::info!("ops-agents listening on http://{}", cfg.functions.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on_ctrl_c(cancel.clone()))
        .await
        .context("HTTP server failed")?;

    cancel.cancel();
    let _ = timer.await;
    Ok(())
}
