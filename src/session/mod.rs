//! Session substrate: durable filesystem layout, append-safe writers, and
//! the atomic state updater. All cross-agent coordination flows through the
//! session directory this module owns.

pub mod log;
pub mod paths;
pub mod state;
pub mod store;
pub mod summary;

pub use log::{DebugRecord, Event, EventLogger, LogLevel, event_types};
pub use state::{
    COORDINATOR, CoordinationStatus, SessionState, SessionStatus, WorkerSlot, WorkerStatus,
};
pub use store::{CreatedSession, SessionStore, deep_merge};

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde_json::Value;

/// Current UTC timestamp, second precision, `Z` suffix.
pub fn iso_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Read a JSONL stream into parsed records.
///
/// A malformed trailing line (a crashed writer's partial record) is
/// discarded; a malformed line anywhere else is corruption and is an error.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut records = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        match serde_json::from_str(line) {
            Ok(value) => records.push(value),
            Err(_) if index + 1 == lines.len() => break,
            Err(err) => bail!(
                "corrupt record at {}:{}: {}",
                path.display(),
                index + 1,
                err
            ),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_now_shape() {
        let now = iso_now();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), 20);
    }

    #[test]
    fn test_read_jsonl_discards_partial_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EVENTS.jsonl");
        std::fs::write(&path, "{\"type\":\"a\"}\n{\"type\":\"b\"}\n{\"type\":\"c").unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["type"], "b");
    }

    #[test]
    fn test_read_jsonl_rejects_mid_stream_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EVENTS.jsonl");
        std::fs::write(&path, "not-json\n{\"type\":\"b\"}\n").unwrap();
        assert!(read_jsonl(&path).is_err());
    }
}
