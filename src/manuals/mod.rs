//! 手册检索：Blob 容器优先，本地目录回退

pub mod blob;
pub mod library;
pub mod source;
pub mod tools;

pub use blob::{BlobConnection, BlobStore, HttpBlobStore, StoreError};
pub use library::{normalize_key, not_found_message, ManualLibrary};
pub use source::{BlobSource, LocalSource, ManualSource};
pub use tools::{
    machine_name_from_args, FetchManualsTool, ManualMarkdownTool, ManualsTool, ManualToolInput,
};
