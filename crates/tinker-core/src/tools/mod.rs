//! Sandboxed tool execution.
//!
//! The executor recognizes five actions (`shell`, `read_file`, `write_file`,
//! `list_files`, `apply_patch`) and runs every one of them against a fixed
//! root directory. Execution is total: any input, valid or not, yields a
//! [`ToolResult`] rather than an uncaught fault.

mod action;
mod executor;
mod schema;

pub use action::ToolAction;
pub use executor::ToolExecutor;
pub use schema::tool_definitions;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a single tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Everything that can go wrong inside the executor.
///
/// All variants are converted into a failed [`ToolResult`] at the executor
/// boundary; none escape as a fault.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument was missing or empty.
    #[error("{0}")]
    MissingArgument(&'static str),

    /// Lexical containment rejected the path before any filesystem access.
    #[error("Path {0} is outside working directory")]
    OutsideRoot(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Command timed out after {0}s")]
    Timeout(u64),

    /// The external `patch` utility is not installed.
    #[error("patch command not found. Install the patch utility or use write_file instead.")]
    PatchUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
