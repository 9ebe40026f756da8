//! Conversation session: an append-only, single-writer message log.
//!
//! A [`Session`] owns the ordered conversation history for one agent
//! instance. Messages are created solely by the mutators here and are never
//! edited after append. The leading system message, when a system prompt is
//! configured, appears exactly once and survives both [`Session::compact`]
//! and [`Session::clear`].

mod message;
mod snapshot;

pub use message::{FunctionCall, Message, Role, ToolCall};
pub use snapshot::SnapshotError;

use chrono::{DateTime, Utc};

/// How many trailing messages survive a compaction.
const COMPACT_KEEP: usize = 10;

/// Conversation history and metadata for one agent session.
#[derive(Debug, Clone)]
pub struct Session {
    working_dir: String,
    system_prompt: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    turn_count: u32,
}

impl Session {
    /// Create a fresh session. A non-empty system prompt becomes the leading
    /// system message.
    pub fn new(working_dir: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(Message::system(system_prompt.clone()));
        }
        Self {
            working_dir: working_dir.into(),
            system_prompt,
            messages,
            created_at: Utc::now(),
            turn_count: 0,
        }
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of user messages added so far.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Ordered view of the conversation. Serializing this slice yields the
    /// wire-format message sequence.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append a user message and advance the turn counter.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.turn_count += 1;
    }

    /// Append an assistant message. Content may be absent when the turn is
    /// tool-only.
    pub fn add_assistant_message(
        &mut self,
        content: Option<String>,
        tool_calls: Option<Vec<ToolCall>>,
    ) {
        self.messages.push(Message::assistant(content, tool_calls));
    }

    /// Append a tool result bound to the request that produced it.
    pub fn add_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) {
        self.messages.push(Message::tool(tool_call_id, name, result));
    }

    /// One-line description of the session for display.
    pub fn context_summary(&self) -> String {
        format!(
            "Turn {} | {} messages | {}",
            self.turn_count,
            self.messages.len(),
            self.working_dir
        )
    }

    /// Replace older history with an externally supplied summary.
    ///
    /// Keeps the leading system message, inserts a synthetic system message
    /// wrapping `summary`, then the last `min(10, n)` of the n remaining
    /// prior messages. The leading system message is never part of the tail,
    /// so it cannot be duplicated on short histories.
    pub fn compact(&mut self, summary: &str) {
        let mut rest = std::mem::take(&mut self.messages);
        let system = match rest.first() {
            Some(m) if m.role == Role::System => Some(rest.remove(0)),
            _ => None,
        };

        let keep_from = rest.len().saturating_sub(COMPACT_KEEP);
        let tail = rest.split_off(keep_from);

        if let Some(system) = system {
            self.messages.push(system);
        }
        self.messages.push(Message::system(format!(
            "[CONVERSATION SUMMARY]\n{summary}\n[END SUMMARY]"
        )));
        self.messages.extend(tail);
    }

    /// Drop all messages except the leading system message and reset the
    /// turn counter.
    pub fn clear(&mut self) {
        let system = match self.messages.first() {
            Some(m) if m.role == Role::System => Some(self.messages.remove(0)),
            _ => None,
        };
        self.messages.clear();
        if let Some(system) = system {
            self.messages.push(system);
        }
        self.turn_count = 0;
    }

    /// Persist the session as a flat JSON snapshot.
    pub fn save(&self, path: &std::path::Path) -> Result<(), SnapshotError> {
        snapshot::save(path, self)
    }

    /// Restore a session from a snapshot written by [`Session::save`].
    pub fn load(path: &std::path::Path) -> Result<Self, SnapshotError> {
        snapshot::load(path)
    }

    pub(crate) fn from_parts(
        working_dir: String,
        system_prompt: String,
        messages: Vec<Message>,
        created_at: DateTime<Utc>,
        turn_count: u32,
    ) -> Self {
        Self {
            working_dir,
            system_prompt,
            messages,
            created_at,
            turn_count,
        }
    }
}
