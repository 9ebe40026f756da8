//! The fixed tool schema advertised to the model service.
//!
//! Five function declarations, stable for wire compatibility. Parameter
//! names and required lists must stay in sync with [`super::ToolAction`].

use serde_json::{json, Value};

/// Function declarations for the chat-completions `tools` field.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "shell",
                "description": "Execute a shell command in the working directory. Use for running tests, installing packages, git operations, etc.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "The shell command to execute"
                        }
                    },
                    "required": ["command"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "read_file",
                "description": "Read the contents of a file at the given path.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the file to read (relative to working directory)"
                        }
                    },
                    "required": ["path"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "write_file",
                "description": "Write content to a file at the given path. Creates the file if it doesn't exist, overwrites if it does.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the file to write (relative to working directory)"
                        },
                        "content": {
                            "type": "string",
                            "description": "Content to write to the file"
                        }
                    },
                    "required": ["path", "content"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "list_files",
                "description": "List files and directories at the given path.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to list (relative to working directory, defaults to '.')"
                        }
                    },
                    "required": []
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "apply_patch",
                "description": "Apply a unified diff patch to modify a file. Use for making targeted edits to existing files.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the file to patch"
                        },
                        "patch": {
                            "type": "string",
                            "description": "The unified diff patch to apply"
                        }
                    },
                    "required": ["path", "patch"]
                }
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_all_five_tools() {
        let names: Vec<String> = tool_definitions()
            .iter()
            .map(|d| d["function"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["shell", "read_file", "write_file", "list_files", "apply_patch"]
        );
    }

    #[test]
    fn every_descriptor_is_a_function() {
        for def in tool_definitions() {
            assert_eq!(def["type"], "function");
            assert!(def["function"]["parameters"]["properties"].is_object());
            assert!(def["function"]["parameters"]["required"].is_array());
        }
    }

    #[test]
    fn list_files_path_is_optional() {
        let defs = tool_definitions();
        let list = defs
            .iter()
            .find(|d| d["function"]["name"] == "list_files")
            .unwrap();
        assert!(list["function"]["parameters"]["required"]
            .as_array()
            .unwrap()
            .is_empty());
    }
}
