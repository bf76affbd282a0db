//! Append-safe session store and atomic state updater.
//!
//! The session directory is the only shared mutable state in the system:
//! the four `.jsonl` streams are append-only across all writers, and
//! `STATE.json` is mutated exclusively through read-modify-atomic-rename.
//! Those two disciplines make concurrent access safe without in-process
//! locking on POSIX filesystems.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::iso_now;
use super::paths::{self, REQUIRED_DIRS, REQUIRED_FILES};
use super::state::SessionState;
use crate::errors::HiveError;
use crate::slug::generate_session_id;

/// Result of a successful `create_session`.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: String,
    pub path: PathBuf,
    pub state: SessionState,
}

/// Handle to the session substrate, bound to a detected project root.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Bind to an explicit project root (used by tests and embedders).
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Detect the project root from the current working directory.
    pub fn discover() -> Result<Self> {
        Ok(Self::new(paths::detect_project_root()?))
    }

    pub fn project_root(&self) -> &Path {
        &self.root
    }

    /// Pure function of root + id.
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        paths::session_path(&self.root, session_id)
    }

    /// Create a new session with complete scaffolding.
    ///
    /// Generates the session id (UTC minute prefix + slug), creates the
    /// directory tree, touches the four JSONL streams, and writes the initial
    /// STATE.json and SESSION.md. Refuses to overwrite an existing session.
    pub fn create_session(&self, task: &str, complexity_level: u8) -> Result<CreatedSession> {
        if !(1..=4).contains(&complexity_level) {
            bail!("complexity level must be 1-4, got {}", complexity_level);
        }

        let session_id = generate_session_id(task);
        let session_path = self.session_path(&session_id);

        if session_path.exists() {
            bail!("refusing to overwrite existing session at {:?}", session_path);
        }

        for dir in REQUIRED_DIRS {
            fs::create_dir_all(session_path.join(dir))
                .with_context(|| format!("Failed to create session directory {}", dir))?;
        }

        for file in ["EVENTS.jsonl", "DEBUG.jsonl", "BACKLOG.jsonl"] {
            OpenOptions::new()
                .create_new(true)
                .append(true)
                .open(session_path.join(file))
                .with_context(|| format!("Failed to create {}", file))?;
        }

        let state = SessionState::new(&session_id, task, complexity_level);
        let state_json = serde_json::to_string_pretty(&state)?;
        fs::write(session_path.join("STATE.json"), state_json)
            .context("Failed to write initial STATE.json")?;

        fs::write(
            session_path.join("SESSION.md"),
            initial_session_summary(&session_id, task, complexity_level),
        )
        .context("Failed to write initial SESSION.md")?;

        Ok(CreatedSession {
            session_id,
            path: session_path,
            state,
        })
    }

    /// Verify the session directory and all sentinel files exist.
    ///
    /// This is a validation boundary: it never creates anything. A missing
    /// file or directory is reported as [`HiveError::SessionNotFound`].
    pub fn ensure_session_exists(&self, session_id: &str) -> Result<()> {
        let session_path = self.session_path(session_id);

        for dir in REQUIRED_DIRS {
            let path = session_path.join(dir);
            if !path.is_dir() {
                return Err(HiveError::SessionNotFound(format!(
                    "required session directory missing: {}",
                    path.display()
                ))
                .into());
            }
        }

        for file in REQUIRED_FILES {
            let path = session_path.join(file);
            if !path.is_file() {
                return Err(HiveError::SessionNotFound(format!(
                    "required session file missing: {}",
                    path.display()
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Append one event record to EVENTS.jsonl. Never rewrites.
    pub fn append_event(&self, session_id: &str, record: Value) -> Result<()> {
        self.append_line(session_id, "EVENTS.jsonl", record)
    }

    /// Append one diagnostic record to DEBUG.jsonl. Never rewrites.
    pub fn append_debug(&self, session_id: &str, record: Value) -> Result<()> {
        self.append_line(session_id, "DEBUG.jsonl", record)
    }

    /// Append one deferred-work record to BACKLOG.jsonl. Never rewrites.
    pub fn append_backlog(&self, session_id: &str, record: Value) -> Result<()> {
        self.append_line(session_id, "BACKLOG.jsonl", record)
    }

    fn append_line(&self, session_id: &str, file: &str, mut record: Value) -> Result<()> {
        if let Some(map) = record.as_object_mut()
            && !map.contains_key("timestamp")
        {
            map.insert("timestamp".to_string(), Value::String(iso_now()));
        }

        // One compact line per record, written with a single syscall so
        // concurrent appenders never interleave within a record.
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let path = self.session_path(session_id).join(file);
        let mut handle = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {} for append", path.display()))?;
        handle
            .write_all(&line)
            .with_context(|| format!("Failed to append to {}", path.display()))?;

        Ok(())
    }

    /// Read STATE.json as a raw JSON document.
    pub fn read_state(&self, session_id: &str) -> Result<Value> {
        let path = self.session_path(session_id).join("STATE.json");
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Read STATE.json as a typed session document.
    pub fn read_state_typed(&self, session_id: &str) -> Result<SessionState> {
        let value = self.read_state(session_id)?;
        serde_json::from_value(value).context("STATE.json does not match the session schema")
    }

    /// Atomically apply a deep-merge patch to STATE.json.
    ///
    /// Read, merge, stamp `last_updated`, increment `update_count`, write a
    /// sibling temp file, fsync, rename over the original. Readers can never
    /// observe a partially written state.
    pub fn update_state(&self, session_id: &str, patch: Value) -> Result<Value> {
        let session_path = self.session_path(session_id);
        let state_path = session_path.join("STATE.json");
        let temp_path = session_path.join(".STATE.json.tmp");

        let mut state = self.read_state(session_id)?;
        deep_merge(&mut state, patch);

        if let Some(map) = state.as_object_mut() {
            map.insert("last_updated".to_string(), Value::String(iso_now()));
            let count = map
                .get("update_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            map.insert("update_count".to_string(), Value::from(count + 1));
        }

        let serialized = serde_json::to_string_pretty(&state)?;

        let write_result = (|| -> Result<()> {
            let mut temp = fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create temp state file {:?}", temp_path))?;
            temp.write_all(serialized.as_bytes())
                .context("Failed to write temp state file")?;
            temp.sync_all().context("Failed to fsync temp state file")?;
            fs::rename(&temp_path, &state_path).context("Failed to rename state file")?;
            Ok(())
        })();

        if write_result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        write_result?;

        Ok(state)
    }

    /// Mark the session completed and stamp final metrics.
    pub fn close_session(&self, session_id: &str) -> Result<Value> {
        let state = self.read_state_typed(session_id)?;
        let coordination = &state.coordination_status;
        let synthesis_ready =
            coordination.workers_pending.is_empty() && coordination.workers_spawned.is_empty();

        self.update_state(
            session_id,
            serde_json::json!({
                "status": "completed",
                "completed_at": iso_now(),
                "coordination_status": {
                    "synthesis_ready": synthesis_ready,
                },
            }),
        )
    }
}

/// Deep-merge `patch` into `base`.
///
/// Maps recurse; every other value (arrays included) replaces wholesale so
/// repeated updates stay idempotent.
pub fn deep_merge(base: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if let Value::Object(base_map) = base {
                for (key, patch_value) in patch_map {
                    let both_maps = patch_value.is_object()
                        && base_map.get(&key).is_some_and(Value::is_object);
                    if both_maps {
                        if let Some(base_value) = base_map.get_mut(&key) {
                            deep_merge(base_value, patch_value);
                        }
                    } else {
                        base_map.insert(key, patch_value);
                    }
                }
            } else {
                *base = Value::Object(patch_map);
            }
        }
        patch_value => *base = patch_value,
    }
}

fn initial_session_summary(session_id: &str, task: &str, complexity_level: u8) -> String {
    format!(
        "# Session: {session_id}\n\
         \n\
         ## Task\n\
         {task}\n\
         \n\
         ## Metadata\n\
         - **Created**: {created}\n\
         - **Complexity Level**: {complexity_level}/4\n\
         - **Coordinator**: queen-orchestrator\n\
         \n\
         ## Workers\n\
         *Pending assignment*\n\
         \n\
         ## Progress\n\
         - [x] Session initialized\n\
         - [ ] Workers planned\n\
         - [ ] Workers spawned\n\
         - [ ] Analysis in progress\n\
         - [ ] Synthesis ready\n\
         - [ ] Session complete\n",
        session_id = session_id,
        task = task,
        created = iso_now(),
        complexity_level = complexity_level,
    )
}
