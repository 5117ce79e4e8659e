//! 手册来源
//!
//! 每个来源对一次查找给出三种结果之一：Ok(Some(text)) 命中、Ok(None) 未找到、Err 访问失败。
//! ManualLibrary 按顺序尝试各来源。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::manuals::blob::{BlobStore, StoreError};

#[async_trait]
pub trait ManualSource: Send + Sync {
    /// 来源名（用于日志）
    fn name(&self) -> &str;

    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// 远端 Blob 容器来源：先检查存在，再按 UTF-8 下载
pub struct BlobSource {
    store: Arc<dyn BlobStore>,
}

impl BlobSource {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ManualSource for BlobSource {
    fn name(&self) -> &str {
        "blob"
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.store.exists(key).await? {
            return Ok(None);
        }
        self.store.download_text(key).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.store.list().await
    }
}

/// 本地回退目录来源
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ManualSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = tokio::fs::read_to_string(&path).await?;
        Ok(Some(text))
    }

    /// 只列出根目录下的普通文件
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(names)
    }
}
