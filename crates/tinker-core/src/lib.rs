//! # tinker-core
//!
//! Core logic for Tinker, a minimal coding agent: a remote conversational
//! model drives local actions (shell commands, file reads/writes, patches,
//! directory listings) executed inside a directory-contained sandbox.
//!
//! This crate is frontend-agnostic; the CLI is one consumer of its
//! contracts.
//!
//! ## Key Concepts
//!
//! - **Session**: append-only conversation log with bounded compaction and
//!   a flat JSON snapshot format
//! - **ToolExecutor**: runs the five recognized actions against a fixed
//!   root directory, always yielding a [`ToolResult`]
//! - **Agent**: the turn loop wiring session, model client, approval gate,
//!   and executor together

pub mod agent;
pub mod approval;
pub mod model;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use agent::{Agent, AgentConfig, AgentError, TurnResult, DEFAULT_SYSTEM_PROMPT};
pub use approval::{AllowAll, ApprovalPolicy, Decision};
pub use model::{openai::OpenAiClient, ModelClient, ModelError, ModelResponse};
pub use session::{Message, Role, Session, ToolCall};
pub use tools::{tool_definitions, ToolExecutor, ToolResult};
