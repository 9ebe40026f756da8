//! The agent turn loop.
//!
//! One call to [`Agent::run`] drives the conversation until the model
//! produces a final answer or the turn ceiling is hit:
//!
//! 1. The user message is appended to the session.
//! 2. The full message history goes to the model with the fixed tool schema.
//! 3. Tool-call responses are executed strictly in model order, one at a
//!    time, each result appended back into the session, and the loop
//!    resubmits.
//! 4. A final text response ends the loop.
//!
//! Tool failures never abort the loop; they are narrated back into the
//! conversation so the model can adapt. Only a model-service failure
//! propagates to the caller.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::approval::{AllowAll, ApprovalPolicy, Decision};
use crate::model::{ModelClient, ModelError};
use crate::session::{Session, ToolCall};
use crate::tools::{tool_definitions, ToolExecutor, ToolResult};

/// Default instructions for the coding agent.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful coding assistant that can read, write, and execute code.

You have access to the following tools:
- shell: Execute shell commands (for running tests, git operations, etc.)
- read_file: Read file contents
- write_file: Write content to files
- list_files: List directory contents
- apply_patch: Apply unified diff patches to files

When helping with coding tasks:
1. First understand the codebase by reading relevant files
2. Make changes incrementally and verify they work
3. Run tests when available to ensure correctness
4. Explain what you're doing as you work

Always be careful with destructive operations and confirm before making major changes.";

/// Sentinel returned when the loop exhausts its iteration ceiling.
pub const TURN_LIMIT_MESSAGE: &str = "Agent reached maximum turn limit.";

/// Tunable parameters for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Hard ceiling on loop iterations per user input.
    pub max_turns: u32,
    /// When false, every tool call is resolved through the approval policy.
    pub auto_approve: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            max_turns: 50,
            auto_approve: true,
        }
    }
}

/// Observable record of one loop iteration.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Assistant text, if any was produced this iteration.
    pub response: Option<String>,
    /// Tool calls requested this iteration, in model order.
    pub tool_calls: Vec<ToolCall>,
    /// One result per tool call, same order.
    pub tool_results: Vec<ToolResult>,
    /// True exactly once, on the iteration that produced the final answer.
    pub finished: bool,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A coding agent bound to a working directory and a model service.
pub struct Agent {
    working_dir: PathBuf,
    config: AgentConfig,
    system_prompt: String,
    session: Session,
    executor: ToolExecutor,
    client: Box<dyn ModelClient>,
    approval: Box<dyn ApprovalPolicy>,
}

impl Agent {
    pub fn new(working_dir: impl Into<PathBuf>, client: Box<dyn ModelClient>) -> Self {
        let working_dir = working_dir.into();
        let working_dir = std::path::absolute(&working_dir).unwrap_or(working_dir);
        let system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        let session = Session::new(
            working_dir.display().to_string(),
            full_prompt(&system_prompt, &working_dir),
        );
        let executor = ToolExecutor::new(&working_dir);
        Self {
            working_dir,
            config: AgentConfig::default(),
            system_prompt,
            session,
            executor,
            client,
            approval: Box::new(AllowAll),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the base instructions. Rebuilds the session, so use this
    /// before the first turn.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self.session = Session::new(
            self.working_dir.display().to_string(),
            full_prompt(&self.system_prompt, &self.working_dir),
        );
        self
    }

    pub fn with_approval(mut self, policy: Box<dyn ApprovalPolicy>) -> Self {
        self.approval = policy;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session access for host-driven maintenance (compaction,
    /// snapshots) between turns.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Discard the session and start fresh, keeping only the working
    /// directory and system prompt.
    pub fn reset(&mut self) {
        self.session = Session::new(
            self.working_dir.display().to_string(),
            full_prompt(&self.system_prompt, &self.working_dir),
        );
    }

    /// Run the loop for one user input and return the final answer.
    pub fn run(&mut self, user_input: &str) -> Result<String, AgentError> {
        self.run_with_observer(user_input, |_| {})
    }

    /// Run the loop, invoking `observe` once per iteration.
    ///
    /// Every iteration's session mutations are applied before `observe`
    /// returns, so a caller that stops consuming cannot corrupt state.
    pub fn run_with_observer<F>(
        &mut self,
        user_input: &str,
        mut observe: F,
    ) -> Result<String, AgentError>
    where
        F: FnMut(&TurnResult),
    {
        self.session.add_user_message(user_input);
        let tools = tool_definitions();

        for _ in 0..self.config.max_turns {
            let response = self
                .client
                .complete(self.session.messages(), &tools, &self.config)?;

            if !response.wants_tools() {
                let text = response.content.unwrap_or_default();
                self.session.add_assistant_message(Some(text.clone()), None);
                observe(&TurnResult {
                    response: Some(text.clone()),
                    tool_calls: Vec::new(),
                    tool_results: Vec::new(),
                    finished: true,
                });
                return Ok(text);
            }

            self.session
                .add_assistant_message(response.content.clone(), Some(response.tool_calls.clone()));

            let mut tool_results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let result = self.execute_call(call);
                let content = if result.success {
                    result.output.clone()
                } else {
                    format!("Error: {}", result.error.as_deref().unwrap_or("unknown"))
                };
                self.session
                    .add_tool_result(call.id.as_str(), call.function.name.as_str(), content);
                tool_results.push(result);
            }

            observe(&TurnResult {
                response: response.content,
                tool_calls: response.tool_calls,
                tool_results,
                finished: false,
            });
        }

        log::warn!("turn limit of {} reached", self.config.max_turns);
        Ok(TURN_LIMIT_MESSAGE.to_string())
    }

    /// Resolve one tool call: parse arguments, consult the approval gate,
    /// then execute. Always yields a result; never a fault.
    fn execute_call(&self, call: &ToolCall) -> ToolResult {
        let name = call.function.name.as_str();

        let args: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(_) => {
                return ToolResult::failure(format!(
                    "Invalid JSON arguments: {}",
                    call.function.arguments
                ));
            }
        };

        if !self.config.auto_approve
            && self.approval.review(name, &call.id, &args) == Decision::Deny
        {
            log::info!("tool call {} ({}) denied", call.id, name);
            return ToolResult::failure("Tool execution denied by user");
        }

        self.executor.execute(name, &args)
    }
}

fn full_prompt(system_prompt: &str, working_dir: &Path) -> String {
    format!(
        "{system_prompt}\n\nWorking Directory: {}\n",
        working_dir.display()
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelResponse;
    use crate::session::Role;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Replays a fixed script of model responses and counts calls.
    struct ScriptedClient {
        script: RefCell<VecDeque<ModelResponse>>,
        calls: Rc<Cell<u32>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<ModelResponse>) -> (Box<Self>, Rc<Cell<u32>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Box::new(Self {
                    script: RefCell::new(script.into()),
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    impl ModelClient for ScriptedClient {
        fn complete(
            &self,
            _messages: &[crate::session::Message],
            _tools: &[Value],
            _config: &AgentConfig,
        ) -> Result<ModelResponse, ModelError> {
            self.calls.set(self.calls.get() + 1);
            match self.script.borrow_mut().pop_front() {
                Some(response) => Ok(response),
                None => Err(ModelError::EmptyResponse),
            }
        }
    }

    /// Denies every request.
    struct DenyAll;

    impl ApprovalPolicy for DenyAll {
        fn review(&self, _tool_name: &str, _call_id: &str, _arguments: &Value) -> Decision {
            Decision::Deny
        }
    }

    fn final_answer(text: &str) -> ModelResponse {
        ModelResponse {
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn tool_request(calls: Vec<ToolCall>) -> ModelResponse {
        ModelResponse {
            content: None,
            tool_calls: calls,
        }
    }

    #[test]
    fn final_answer_ends_the_loop() {
        let dir = tempdir().unwrap();
        let (client, calls) = ScriptedClient::new(vec![final_answer("done")]);
        let mut agent = Agent::new(dir.path(), client);

        let answer = agent.run("do a thing").unwrap();

        assert_eq!(answer, "done");
        assert_eq!(calls.get(), 1);

        let roles: Vec<Role> = agent.session().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(agent.session().turn_count(), 1);
    }

    #[test]
    fn tool_results_land_in_session_in_request_order() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "contents").unwrap();

        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![
                ToolCall::new("call_a", "read_file", "{\"path\":\"a.txt\"}"),
                ToolCall::new("call_b", "read_file", "{\"path\":\"missing.txt\"}"),
            ]),
            final_answer("finished"),
        ]);
        let mut agent = Agent::new(dir.path(), client);

        agent.run("read both").unwrap();

        let messages = agent.session().messages();
        // system, user, assistant(tool_calls), tool A, tool B, assistant final
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(messages[3].content.as_deref(), Some("contents"));
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_b"));
        assert_eq!(
            messages[4].content.as_deref(),
            Some("Error: File not found: missing.txt")
        );
    }

    #[test]
    fn failure_does_not_block_later_calls_in_the_batch() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![
                ToolCall::new("call_1", "read_file", "{\"path\":\"missing.txt\"}"),
                ToolCall::new("call_2", "write_file", "{\"path\":\"ok.txt\",\"content\":\"hi\"}"),
            ]),
            final_answer("finished"),
        ]);
        let mut agent = Agent::new(dir.path(), client);

        agent.run("go").unwrap();

        assert!(dir.path().join("ok.txt").exists());
    }

    #[test]
    fn observer_sees_each_iteration_and_the_finish() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![ToolCall::new("call_1", "list_files", "{}")]),
            final_answer("all set"),
        ]);
        let mut agent = Agent::new(dir.path(), client);

        let mut turns: Vec<(usize, bool)> = Vec::new();
        agent
            .run_with_observer("look around", |turn| {
                turns.push((turn.tool_results.len(), turn.finished));
            })
            .unwrap();

        assert_eq!(turns, vec![(1, false), (0, true)]);
    }

    #[test]
    fn turn_limit_stops_without_further_model_calls() {
        let dir = tempdir().unwrap();
        let request = || tool_request(vec![ToolCall::new("call_x", "list_files", "{}")]);
        let (client, calls) = ScriptedClient::new(vec![request(), request(), request(), request()]);

        let mut agent = Agent::new(dir.path(), client).with_config(AgentConfig {
            max_turns: 3,
            ..AgentConfig::default()
        });

        let answer = agent.run("never finish").unwrap();

        assert_eq!(answer, TURN_LIMIT_MESSAGE);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn invalid_json_arguments_are_narrated_not_fatal() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![ToolCall::new("call_1", "shell", "not json")]),
            final_answer("recovered"),
        ]);
        let mut agent = Agent::new(dir.path(), client);

        let answer = agent.run("go").unwrap();

        assert_eq!(answer, "recovered");
        let tool_msg = &agent.session().messages()[3];
        assert_eq!(
            tool_msg.content.as_deref(),
            Some("Error: Invalid JSON arguments: not json")
        );
    }

    #[test]
    fn denial_skips_the_executor() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![ToolCall::new(
                "call_1",
                "write_file",
                "{\"path\":\"evil.txt\",\"content\":\"x\"}",
            )]),
            final_answer("ok"),
        ]);

        let mut agent = Agent::new(dir.path(), client)
            .with_config(AgentConfig {
                auto_approve: false,
                ..AgentConfig::default()
            })
            .with_approval(Box::new(DenyAll));

        agent.run("try it").unwrap();

        assert!(!dir.path().join("evil.txt").exists());
        let tool_msg = &agent.session().messages()[3];
        assert_eq!(
            tool_msg.content.as_deref(),
            Some("Error: Tool execution denied by user")
        );
    }

    #[test]
    fn gate_is_not_consulted_when_auto_approving() {
        // DenyAll would block everything, but auto_approve bypasses the gate.
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![
            tool_request(vec![ToolCall::new(
                "call_1",
                "write_file",
                "{\"path\":\"fine.txt\",\"content\":\"x\"}",
            )]),
            final_answer("ok"),
        ]);

        let mut agent = Agent::new(dir.path(), client).with_approval(Box::new(DenyAll));
        agent.run("write it").unwrap();

        assert!(dir.path().join("fine.txt").exists());
    }

    #[test]
    fn model_failure_propagates() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![]);
        let mut agent = Agent::new(dir.path(), client);

        let result = agent.run("hello");

        assert!(matches!(result, Err(AgentError::Model(_))));
    }

    #[test]
    fn reset_keeps_only_root_and_prompt() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![final_answer("hi")]);
        let mut agent = Agent::new(dir.path(), client);

        agent.run("hello").unwrap();
        assert!(agent.session().messages().len() > 1);

        agent.reset();

        assert_eq!(agent.session().messages().len(), 1);
        assert_eq!(agent.session().messages()[0].role, Role::System);
        assert_eq!(agent.session().turn_count(), 0);
    }

    #[test]
    fn system_prompt_includes_working_directory() {
        let dir = tempdir().unwrap();
        let (client, _) = ScriptedClient::new(vec![]);
        let agent = Agent::new(dir.path(), client);

        let system = agent.session().messages()[0].content.as_deref().unwrap();
        assert!(system.contains("Working Directory:"));
        assert!(system.starts_with("You are a helpful coding assistant"));
    }
}
