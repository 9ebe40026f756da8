//! The closed set of actions the executor recognizes.

use serde_json::Value;

use super::ToolError;

/// A validated tool invocation.
///
/// Adding a tool means adding a variant here, a parse arm, a dispatch arm in
/// the executor, and a descriptor in the schema — unknown names fail a
/// single gate instead of a lookup miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    Shell { command: String },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    ListFiles { path: String },
    ApplyPatch { path: String, patch: String },
}

impl ToolAction {
    /// Parse a (tool name, JSON arguments) pair into an action.
    ///
    /// Unknown names and missing required arguments are rejected here,
    /// before the executor touches the filesystem.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        match name {
            "shell" => {
                let command = required(args, "command", "No command provided")?;
                Ok(ToolAction::Shell { command })
            }
            "read_file" => {
                let path = required(args, "path", "No path provided")?;
                Ok(ToolAction::ReadFile { path })
            }
            "write_file" => {
                let path = required(args, "path", "No path provided")?;
                let content = optional(args, "content");
                Ok(ToolAction::WriteFile { path, content })
            }
            "list_files" => {
                let path = match args.get("path").and_then(Value::as_str) {
                    Some(p) if !p.is_empty() => p.to_string(),
                    _ => ".".to_string(),
                };
                Ok(ToolAction::ListFiles { path })
            }
            "apply_patch" => {
                let path = required(args, "path", "No path provided")?;
                let patch = required(args, "patch", "No patch provided")?;
                Ok(ToolAction::ApplyPatch { path, patch })
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            ToolAction::Shell { .. } => "shell",
            ToolAction::ReadFile { .. } => "read_file",
            ToolAction::WriteFile { .. } => "write_file",
            ToolAction::ListFiles { .. } => "list_files",
            ToolAction::ApplyPatch { .. } => "apply_patch",
        }
    }
}

fn required(args: &Value, key: &str, missing: &'static str) -> Result<String, ToolError> {
    match args.get(key).and_then(Value::as_str) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ToolError::MissingArgument(missing)),
    }
}

fn optional(args: &Value, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_tool() {
        assert_eq!(
            ToolAction::parse("shell", &json!({"command": "ls"})).unwrap(),
            ToolAction::Shell {
                command: "ls".to_string()
            }
        );
        assert_eq!(
            ToolAction::parse("read_file", &json!({"path": "a.txt"})).unwrap(),
            ToolAction::ReadFile {
                path: "a.txt".to_string()
            }
        );
        assert_eq!(
            ToolAction::parse("write_file", &json!({"path": "a.txt", "content": "hi"})).unwrap(),
            ToolAction::WriteFile {
                path: "a.txt".to_string(),
                content: "hi".to_string()
            }
        );
        assert_eq!(
            ToolAction::parse("list_files", &json!({"path": "sub"})).unwrap(),
            ToolAction::ListFiles {
                path: "sub".to_string()
            }
        );
        assert_eq!(
            ToolAction::parse("apply_patch", &json!({"path": "a.txt", "patch": "--- a"})).unwrap(),
            ToolAction::ApplyPatch {
                path: "a.txt".to_string(),
                patch: "--- a".to_string()
            }
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = ToolAction::parse("frobnicate", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: frobnicate");
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = ToolAction::parse("shell", &json!({"command": ""})).unwrap_err();
        assert_eq!(err.to_string(), "No command provided");
    }

    #[test]
    fn missing_path_is_rejected() {
        for tool in ["read_file", "write_file", "apply_patch"] {
            let err = ToolAction::parse(tool, &json!({})).unwrap_err();
            assert_eq!(err.to_string(), "No path provided", "tool: {tool}");
        }
    }

    #[test]
    fn missing_patch_is_rejected() {
        let err = ToolAction::parse("apply_patch", &json!({"path": "a.txt"})).unwrap_err();
        assert_eq!(err.to_string(), "No patch provided");
    }

    #[test]
    fn list_files_defaults_to_current_dir() {
        assert_eq!(
            ToolAction::parse("list_files", &json!({})).unwrap(),
            ToolAction::ListFiles {
                path: ".".to_string()
            }
        );
    }

    #[test]
    fn write_file_content_defaults_to_empty() {
        assert_eq!(
            ToolAction::parse("write_file", &json!({"path": "a.txt"})).unwrap(),
            ToolAction::WriteFile {
                path: "a.txt".to_string(),
                content: String::new()
            }
        );
    }
}
