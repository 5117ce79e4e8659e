//! Agent 注册表
//!
//! 两阶段构建：先用 [`AgentPlan`] 沿 handover 加载全部描述符并排出依赖顺序，
//! 再按顺序实例化（被委派方先于委派方），实例化时把已就绪的目标包装成 HandoffTool。
//! 注册表由调用方持有，所有 Agent 共用注入的 SharedHistory。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::agents::agent::{Agent, AgentSettings};
use crate::agents::descriptor::AgentDescriptor;
use crate::agents::handoff::HandoffTool;
use crate::agents::plan::AgentPlan;
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::LlmFactory;
use crate::memory::SharedHistory;
use crate::tools::{ToolCatalog, ToolContext, ToolRegistry};

pub struct AgentRegistry {
    agents_dir: PathBuf,
    catalog: ToolCatalog,
    tool_context: ToolContext,
    llm_factory: Arc<dyn LlmFactory>,
    history: SharedHistory,
    settings: AgentSettings,
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

pub struct AgentRegistryBuilder {
    agents_dir: PathBuf,
    llm_factory: Arc<dyn LlmFactory>,
    catalog: Option<ToolCatalog>,
    tool_context: ToolContext,
    history: SharedHistory,
    settings: AgentSettings,
}

impl AgentRegistryBuilder {
    pub fn catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn tool_context(mut self, ctx: ToolContext) -> Self {
        self.tool_context = ctx;
        self
    }

    pub fn history(mut self, history: SharedHistory) -> Self {
        self.history = history;
        self
    }

    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents_dir: self.agents_dir,
            catalog: self.catalog.unwrap_or_else(ToolCatalog::builtin),
            tool_context: self.tool_context,
            llm_factory: self.llm_factory,
            history: self.history,
            settings: self.settings,
            agents: RwLock::new(HashMap::new()),
        }
    }
}

impl AgentRegistry {
    pub fn builder(
        agents_dir: impl Into<PathBuf>,
        llm_factory: Arc<dyn LlmFactory>,
    ) -> AgentRegistryBuilder {
        AgentRegistryBuilder {
            agents_dir: agents_dir.into(),
            llm_factory,
            catalog: None,
            tool_context: ToolContext::default(),
            history: SharedHistory::new(),
            settings: AgentSettings::default(),
        }
    }

    /// 按应用配置组装：agents_dir、max_steps、工具超时与手册连接参数
    pub fn from_config(
        cfg: &AppConfig,
        llm_factory: Arc<dyn LlmFactory>,
        history: SharedHistory,
    ) -> Self {
        Self::builder(&cfg.app.agents_dir, llm_factory)
            .tool_context(ToolContext::new(cfg.manuals.clone()))
            .history(history)
            .settings(AgentSettings {
                max_steps: cfg.app.max_steps,
                tool_timeout_secs: cfg.tools.tool_timeout_secs,
            })
            .build()
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub async fn get(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(agent_id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 已注册则直接返回；否则从 `<agents_dir>/<agent_id>/` 加载并连同其 handover 闭包一起构建
    pub async fn get_or_create(&self, agent_id: &str) -> Result<Arc<Agent>, AgentError> {
        if let Some(agent) = self.get(agent_id).await {
            return Ok(agent);
        }

        let mut agents = self.agents.write().await;
        if let Some(agent) = agents.get(agent_id) {
            return Ok(agent.clone());
        }

        let plan = AgentPlan::build(
            agent_id,
            |id| AgentDescriptor::load_dir(&self.agents_dir, id),
            |id| agents.contains_key(id),
        )?;
        tracing::info!(agent = %agent_id, build_order = ?plan.ids(), "building agents");

        // 先全部实例化再写入，任一失败则不注册任何 Agent
        let mut built: HashMap<String, Arc<Agent>> = HashMap::new();
        for descriptor in plan.into_descriptors() {
            let id = descriptor.config.id.clone();
            let agent = self.instantiate(descriptor, |target| {
                built.get(target).or_else(|| agents.get(target)).cloned()
            })?;
            built.insert(id, Arc::new(agent));
        }
        agents.extend(built);

        agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentError::UnknownAgent(agent_id.to_string()))
    }

    /// 解析命名工具 + 为每个 handover 目标挂 HandoffTool（顺序：tools 在前）
    fn instantiate<F>(&self, descriptor: AgentDescriptor, lookup: F) -> Result<Agent, AgentError>
    where
        F: Fn(&str) -> Option<Arc<Agent>>,
    {
        let config = &descriptor.config;
        let mut tools = ToolRegistry::new();
        for name in &config.tools {
            tools.register(self.catalog.resolve(name, &self.tool_context)?)?;
        }
        for target_id in &config.handover {
            let target =
                lookup(target_id).ok_or_else(|| AgentError::UnknownAgent(target_id.clone()))?;
            tools.register(Arc::new(HandoffTool::new(target)))?;
        }

        let llm = self.llm_factory.create(&config.model)?;
        tracing::debug!(agent = %config.id, tools = ?tools.tool_names(), "agent instantiated");
        Ok(Agent::new(
            descriptor,
            llm,
            tools,
            self.history.clone(),
            self.settings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::descriptor::{CONFIG_FILE, INSTRUCTIONS_FILE};
    use crate::llm::{ScriptedLlmClient, ScriptedLlmFactory};

    fn write_agent(root: &Path, id: &str, config: serde_json::Value) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), config.to_string()).unwrap();
        std::fs::write(dir.join(INSTRUCTIONS_FILE), format!("You are {}.", id)).unwrap();
    }

    fn registry(root: &Path) -> AgentRegistry {
        let factory = ScriptedLlmFactory::new(Arc::new(ScriptedLlmClient::default()));
        AgentRegistry::builder(root, Arc::new(factory)).build()
    }

    #[tokio::test]
    async fn test_dispatcher_builds_handover_closure() {
        let root = tempfile::tempdir().unwrap();
        write_agent(
            root.path(),
            "dispatcher_agent",
            serde_json::json!({"id": "dispatcher_agent", "model": "m", "handover": ["manual_agent", "maintenance_agent"]}),
        );
        write_agent(
            root.path(),
            "manual_agent",
            serde_json::json!({"id": "manual_agent", "model": "m", "tools": ["manuals_tool", "fetch_manuals"]}),
        );
        write_agent(
            root.path(),
            "maintenance_agent",
            serde_json::json!({"id": "maintenance_agent", "model": "m"}),
        );

        let reg = registry(root.path());
        let dispatcher = reg.get_or_create("dispatcher_agent").await.unwrap();
        assert_eq!(
            dispatcher.tool_names(),
            vec!["transfer_to_manual_agent", "transfer_to_maintenance_agent"]
        );
        assert_eq!(
            reg.ids().await,
            vec!["dispatcher_agent", "maintenance_agent", "manual_agent"]
        );

        let manual = reg.get("manual_agent").await.unwrap();
        assert_eq!(manual.tool_names(), vec!["manuals_tool", "fetch_manuals"]);

        // 再次获取返回同一实例
        let again = reg.get_or_create("dispatcher_agent").await.unwrap();
        assert!(Arc::ptr_eq(&dispatcher, &again));
    }

    #[tokio::test]
    async fn test_existing_target_reused() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "manual_agent", serde_json::json!({"id": "manual_agent", "model": "m"}));
        write_agent(
            root.path(),
            "dispatcher_agent",
            serde_json::json!({"id": "dispatcher_agent", "model": "m", "handover": ["manual_agent"]}),
        );

        let reg = registry(root.path());
        let manual = reg.get_or_create("manual_agent").await.unwrap();
        reg.get_or_create("dispatcher_agent").await.unwrap();
        assert!(Arc::ptr_eq(&manual, &reg.get("manual_agent").await.unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_tool_registers_nothing() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "manual_agent", serde_json::json!({"id": "manual_agent", "model": "m"}));
        write_agent(
            root.path(),
            "dispatcher_agent",
            serde_json::json!({"id": "dispatcher_agent", "model": "m", "tools": ["shell_exec"], "handover": ["manual_agent"]}),
        );

        let reg = registry(root.path());
        match reg.get_or_create("dispatcher_agent").await {
            Err(AgentError::ToolNotFound(name)) => assert_eq!(name, "shell_exec"),
            other => panic!("expected ToolNotFound, got {:?}", other.map(|a| a.id().to_string())),
        }
        assert!(reg.ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tool_in_config() {
        let root = tempfile::tempdir().unwrap();
        write_agent(
            root.path(),
            "a",
            serde_json::json!({"id": "a", "model": "m", "tools": ["manuals_tool", "manuals_tool"]}),
        );
        assert!(matches!(
            registry(root.path()).get_or_create("a").await,
            Err(AgentError::DuplicateTool(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_agent_and_cycle() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "a", serde_json::json!({"id": "a", "model": "m", "handover": ["b"]}));
        write_agent(root.path(), "b", serde_json::json!({"id": "b", "model": "m", "handover": ["a"]}));

        let reg = registry(root.path());
        assert!(matches!(
            reg.get_or_create("nobody").await,
            Err(AgentError::UnknownAgent(_))
        ));
        assert!(matches!(
            reg.get_or_create("a").await,
            Err(AgentError::ConfigError(_))
        ));
    }
}
