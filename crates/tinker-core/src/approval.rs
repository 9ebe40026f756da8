//! Tool approval gate.
//!
//! A pluggable allow/deny decision point consulted before each tool
//! invocation when auto-approval is disabled. The absence of a policy is
//! expressed explicitly as [`AllowAll`] rather than an implicit null check.

use serde_json::Value;

/// A user's decision on a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

/// One-method capability deciding whether a tool call may run.
pub trait ApprovalPolicy {
    /// Review one invocation. `arguments` is the already-parsed payload.
    fn review(&self, tool_name: &str, call_id: &str, arguments: &Value) -> Decision;
}

/// The explicit always-allow policy.
pub struct AllowAll;

impl ApprovalPolicy for AllowAll {
    fn review(&self, _tool_name: &str, _call_id: &str, _arguments: &Value) -> Decision {
        Decision::Approve
    }
}
