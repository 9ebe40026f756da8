//! Session snapshot persistence.
//!
//! A snapshot is a flat JSON object:
//!
//! ```text
//! {
//!   "working_dir": "...",
//!   "system_prompt": "...",
//!   "messages": [ ...wire-format messages... ],
//!   "created_at": "2026-08-30T10:15:30.123456Z",
//!   "turn_count": 3
//! }
//! ```
//!
//! # Design Notes
//!
//! - **Atomic writes**: write to a `.tmp` sibling, then rename, so an
//!   interrupted save never corrupts an existing snapshot.
//! - The message array is the same serde projection used on the wire, so a
//!   load reproduces the conversation exactly as the model would see it.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Message, Session};

/// Error type for snapshot save/load operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Invalid created_at timestamp: {0}")]
    InvalidTimestamp(String),
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    working_dir: String,
    system_prompt: String,
    messages: Vec<Message>,
    created_at: String,
    turn_count: u32,
}

/// Save a session snapshot to `path`, creating parent directories as needed.
pub fn save(path: &Path, session: &Session) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let snapshot = Snapshot {
        working_dir: session.working_dir().to_string(),
        system_prompt: session.system_prompt().to_string(),
        messages: session.messages().to_vec(),
        created_at: session.created_at().to_rfc3339(),
        turn_count: session.turn_count(),
    };

    let json = serde_json::to_string_pretty(&snapshot)?;

    // Write to temp file first, then rename into place.
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Load a session from a snapshot written by [`save`].
pub fn load(path: &Path) -> Result<Session, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::NotFound(path.display().to_string()));
    }

    let contents = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&contents)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&snapshot.created_at)
        .map_err(|_| SnapshotError::InvalidTimestamp(snapshot.created_at.clone()))?
        .with_timezone(&Utc);

    Ok(Session::from_parts(
        snapshot.working_dir,
        snapshot.system_prompt,
        snapshot.messages,
        created_at,
        snapshot.turn_count,
    ))
}
