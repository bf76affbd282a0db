//! Project-root detection and session path layout.
//!
//! All components resolve paths through this module so every agent in a
//! session agrees on the same on-disk locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Directory (relative to the project root) that holds all sessions.
pub const SESSIONS_DIR: &str = "Docs/hive-mind/sessions";

/// Marker directories that identify a project root.
const ROOT_MARKERS: [&str; 2] = ["Docs/hive-mind", ".claude"];

/// Sentinel files every session root must contain.
pub const REQUIRED_FILES: [&str; 5] = [
    "STATE.json",
    "EVENTS.jsonl",
    "DEBUG.jsonl",
    "BACKLOG.jsonl",
    "SESSION.md",
];

/// Directories every session root must contain.
pub const REQUIRED_DIRS: [&str; 4] = ["workers", "workers/json", "workers/prompts", "workers/notes"];

/// Detect the project root by walking upward from the current directory.
///
/// A directory is the root iff it contains both `Docs/hive-mind/` and the
/// hidden `.claude/` control directory. Detection never creates anything;
/// a missing root is a hard error.
pub fn detect_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current working directory")?;
    detect_project_root_from(&cwd)
}

/// Root detection starting from an explicit directory (pure in `start`).
pub fn detect_project_root_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if ROOT_MARKERS.iter().all(|marker| current.join(marker).is_dir()) {
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    bail!(
        "Could not detect project root from {:?}. \
         Ensure you're running from within a project with a hive-mind structure \
         (Docs/hive-mind/ and .claude/ present).",
        start
    )
}

/// Pure path math: `<root>/Docs/hive-mind/sessions/<session_id>`.
pub fn session_path(project_root: &Path, session_id: &str) -> PathBuf {
    project_root.join(SESSIONS_DIR).join(session_id)
}

/// Path to a worker's prompt file inside a session root.
pub fn prompt_path(session_root: &Path, worker_type: &str) -> PathBuf {
    session_root
        .join("workers/prompts")
        .join(format!("{}.prompt", worker_type))
}

/// Path to a worker's notes file inside a session root.
pub fn notes_path(session_root: &Path, file_prefix: &str) -> PathBuf {
    session_root
        .join("workers/notes")
        .join(format!("{}_notes.md", file_prefix))
}

/// Path to a worker's structured output file inside a session root.
pub fn output_path(session_root: &Path, file_prefix: &str) -> PathBuf {
    session_root
        .join("workers/json")
        .join(format!("{}_output.json", file_prefix))
}
