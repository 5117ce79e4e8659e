//! 手册库：按顺序尝试各来源（Blob → 本地目录）
//!
//! 来源访问失败记 warn 日志后继续下一来源，不重试；全部未命中时返回固定的 not-found 文本，不报错。
//! 只有非法的机器名（空、含路径分隔符或 `..`）会在任何 I/O 之前报 InvalidArgument。

use std::sync::Arc;

use crate::config::ManualsSection;
use crate::core::AgentError;
use crate::manuals::blob::{BlobStore, HttpBlobStore};
use crate::manuals::source::{BlobSource, LocalSource, ManualSource};

const MANUAL_EXTENSION: &str = ".md";

/// 机器名 → Blob 键：缺少 `.md` 时补上
pub fn normalize_key(machine_name: &str) -> Result<String, AgentError> {
    let name = machine_name.trim();
    if name.is_empty() {
        return Err(AgentError::InvalidArgument(
            "Missing required argument 'machine_name'".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AgentError::InvalidArgument(format!(
            "machine_name must be a plain name: {}",
            name
        )));
    }
    if name.ends_with(MANUAL_EXTENSION) {
        Ok(name.to_string())
    } else {
        Ok(format!("{}{}", name, MANUAL_EXTENSION))
    }
}

/// 未找到时返回给模型的固定文本
pub fn not_found_message(key: &str) -> String {
    format!("Machine file '{}' not found", key)
}

pub struct ManualLibrary {
    sources: Vec<Arc<dyn ManualSource>>,
}

impl ManualLibrary {
    pub fn new(sources: Vec<Arc<dyn ManualSource>>) -> Self {
        Self { sources }
    }

    /// 按 [manuals] 配置装配：连接串可解析时加入 Blob 来源，本地目录总是最后一个来源
    pub fn from_settings(settings: &ManualsSection) -> Self {
        let store = settings.connection_string.as_deref().and_then(|cs| {
            match HttpBlobStore::from_connection_string(cs, settings.container.clone()) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn BlobStore>),
                Err(e) => {
                    tracing::warn!(error = %e, "manual blob store unavailable, using local fallback only");
                    None
                }
            }
        });
        Self::with_store(store, settings)
    }

    /// 显式指定 Blob 存储（None 表示只用本地目录）
    pub fn with_store(store: Option<Arc<dyn BlobStore>>, settings: &ManualsSection) -> Self {
        let mut sources: Vec<Arc<dyn ManualSource>> = Vec::new();
        if let Some(store) = store {
            sources.push(Arc::new(BlobSource::new(store)));
        }
        sources.push(Arc::new(LocalSource::new(&settings.fallback_path)));
        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// 取手册全文；未找到返回 not_found_message
    pub async fn fetch(&self, machine_name: &str) -> Result<String, AgentError> {
        let key = normalize_key(machine_name)?;
        for source in &self.sources {
            match source.fetch(&key).await {
                Ok(Some(text)) => {
                    tracing::info!(key = %key, source = %source.name(), "manual found");
                    return Ok(text);
                }
                Ok(None) => {
                    tracing::debug!(key = %key, source = %source.name(), "manual not in source");
                }
                Err(e) => {
                    tracing::warn!(key = %key, source = %source.name(), error = %e, "manual source failed, trying next");
                }
            }
        }
        Ok(not_found_message(&key))
    }

    /// 列出可用手册：第一个给出非空列表的来源为准；排序去重
    pub async fn list(&self) -> Vec<String> {
        for source in &self.sources {
            match source.list().await {
                Ok(names) if !names.is_empty() => {
                    let mut names = names;
                    names.sort();
                    names.dedup();
                    return names;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "manual listing failed, trying next");
                }
            }
        }
        Vec::new()
    }
}
