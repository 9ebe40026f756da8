//! Interactive REPL and turn rendering.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;

use tinker_core::{Agent, ApprovalPolicy, Decision, ToolCall, ToolResult, TurnResult};

const TOOL_ARG_PREVIEW: usize = 100;
const TOOL_OUTPUT_PREVIEW: usize = 500;
const HISTORY_PREVIEW: usize = 200;

/// Interactive y/N confirmation for each tool call.
pub struct PromptApproval;

impl ApprovalPolicy for PromptApproval {
    fn review(&self, tool_name: &str, _call_id: &str, arguments: &Value) -> Decision {
        println!("\n{}", format!("Tool request: {tool_name}").yellow());
        if let Some(args) = arguments.as_object() {
            for (key, value) in args {
                println!("  {key}: {value}");
            }
        }
        print!("Approve? [y/N] ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return Decision::Deny;
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Decision::Approve,
            _ => Decision::Deny,
        }
    }
}

/// Run the agent in interactive REPL mode.
pub fn run_interactive(agent: &mut Agent) -> Result<()> {
    println!("{}", "Tinker - Interactive Mode".bold());
    println!(
        "{}",
        format!("Working directory: {}", agent.working_dir().display()).dimmed()
    );
    println!(
        "{}",
        "Type 'exit' or 'quit' to leave, 'reset' to clear history\n".dimmed()
    );

    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "reset" => {
                agent.reset();
                println!("{}", "Session reset.".yellow());
                continue;
            }
            "history" => {
                print_history(agent);
                continue;
            }
            _ => {}
        }

        if let Err(err) = agent.run_with_observer(input, render_turn) {
            println!("{}", format!("Error: {err}").red());
        }
    }

    Ok(())
}

/// Run the agent with a single prompt and exit.
pub fn run_single(agent: &mut Agent, prompt: &str) -> Result<()> {
    agent.run_with_observer(prompt, render_turn)?;
    Ok(())
}

fn render_turn(turn: &TurnResult) {
    for (call, result) in turn.tool_calls.iter().zip(turn.tool_results.iter()) {
        print_tool_call(call);
        print_tool_result(call, result);
    }

    if turn.finished {
        if let Some(response) = turn.response.as_deref() {
            println!("\n{}", response.green());
        }
    }
}

fn print_tool_call(call: &ToolCall) {
    println!("\n{}", format!("[Tool: {}]", call.function.name).cyan());

    let args: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
    if let Some(args) = args.as_object() {
        for (key, value) in args {
            let shown = truncate(&value.to_string(), TOOL_ARG_PREVIEW);
            println!("{}", format!("  {key}: {shown}").dimmed());
        }
    }
}

fn print_tool_result(call: &ToolCall, result: &ToolResult) {
    let name = &call.function.name;
    if result.success {
        println!("{}", format!("[{name} completed]").green());
        if !result.output.is_empty() {
            let shown = if result.output.len() > TOOL_OUTPUT_PREVIEW {
                let hidden = result.output.len() - TOOL_OUTPUT_PREVIEW;
                format!(
                    "{}\n... ({hidden} more characters)",
                    truncate(&result.output, TOOL_OUTPUT_PREVIEW)
                )
            } else {
                result.output.clone()
            };
            println!("{shown}");
        }
    } else {
        let error = result.error.as_deref().unwrap_or("unknown");
        println!("{}", format!("[{name} failed: {error}]").red());
    }
}

fn print_history(agent: &Agent) {
    for msg in agent.session().messages() {
        println!("{}", format!("[{}]", msg.role).cyan());
        if let Some(content) = msg.content.as_deref() {
            println!("{}", truncate(content, HISTORY_PREVIEW));
        }
    }
}

/// Char-boundary-safe prefix.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let prefix: String = s.chars().take(max).collect();
        format!("{prefix}...")
    }
}
