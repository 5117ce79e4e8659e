pub mod catalog;
pub mod executor;
pub mod registry;
pub mod schema;

pub use catalog::{ToolCatalog, ToolConstructor, ToolContext};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry};
pub use schema::{parameters_schema_for, tool_call_schema_json};
