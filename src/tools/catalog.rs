//! 工具目录：工具名 → 构造函数
//!
//! Agent 描述符里的 tools 列表按名在这里解析。目录启动时构建一次，同名重复注册直接报错，
//! 未登记的名字解析为 ToolNotFound（不跳过）。

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ManualsSection;
use crate::core::AgentError;
use crate::manuals::{BlobStore, FetchManualsTool, ManualLibrary, ManualMarkdownTool, ManualsTool};
use crate::tools::Tool;

/// 构造工具时可用的连接参数
#[derive(Clone, Default)]
pub struct ToolContext {
    pub manuals: ManualsSection,
    /// 覆盖按连接串创建的 Blob 存储（测试或自定义存储）
    pub blob_store: Option<Arc<dyn BlobStore>>,
}

impl ToolContext {
    pub fn new(manuals: ManualsSection) -> Self {
        Self {
            manuals,
            blob_store: None,
        }
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// 每次构造工具都新建手册库（不缓存）
    pub fn manual_library(&self) -> Arc<ManualLibrary> {
        let library = match &self.blob_store {
            Some(store) => ManualLibrary::with_store(Some(store.clone()), &self.manuals),
            None => ManualLibrary::from_settings(&self.manuals),
        };
        Arc::new(library)
    }
}

pub type ToolConstructor = fn(&ToolContext) -> Result<Arc<dyn Tool>, AgentError>;

#[derive(Default)]
pub struct ToolCatalog {
    constructors: HashMap<String, ToolConstructor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置工具：manuals_tool（别名 manuals_tools）、fetch_manuals、manual_markdown_lookup
    pub fn builtin() -> Self {
        let constructors = builtin_entries()
            .into_iter()
            .map(|(name, ctor)| (name.to_string(), ctor))
            .collect();
        Self { constructors }
    }

    pub fn register(&mut self, name: &str, ctor: ToolConstructor) -> Result<(), AgentError> {
        if self.constructors.contains_key(name) {
            return Err(AgentError::DuplicateTool(name.to_string()));
        }
        self.constructors.insert(name.to_string(), ctor);
        Ok(())
    }

    pub fn resolve(&self, name: &str, ctx: &ToolContext) -> Result<Arc<dyn Tool>, AgentError> {
        let ctor = self
            .constructors
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        ctor(ctx)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

fn builtin_entries() -> [(&'static str, ToolConstructor); 4] {
    [
        (ManualsTool::NAME, |ctx| {
            Ok(Arc::new(ManualsTool::new(ctx.manual_library())))
        }),
        ("manuals_tools", |ctx| {
            Ok(Arc::new(ManualsTool::named(
                "manuals_tools",
                ctx.manual_library(),
            )))
        }),
        (FetchManualsTool::NAME, |ctx| {
            Ok(Arc::new(FetchManualsTool::new(ctx.manual_library())))
        }),
        (ManualMarkdownTool::NAME, |ctx| {
            Ok(Arc::new(ManualMarkdownTool::new(ctx.manual_library())))
        }),
    ]
}
