//! Slug and session-id generation utilities.
//!
//! Session ids have the shape `YYYY-MM-DD-HH-mm-<slug>` where the slug is
//! 15-50 characters of `[a-z0-9-]` derived from the task text.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum length for a session slug.
const MIN_SLUG_LENGTH: usize = 15;

/// Maximum length for a session slug (directory names stay readable).
const MAX_SLUG_LENGTH: usize = 50;

/// Suffix appended to short slugs to reach the minimum length.
const PAD_SUFFIX: &str = "-orchestration";

static SESSION_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-[a-z0-9-]{15,50}$")
        .expect("session id pattern is valid")
});

/// Convert a string to a filesystem-friendly slug (basic conversion).
///
/// Does NOT enforce length bounds - use `session_slug` for session ids.
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    // Collapse consecutive dashes and trim leading/trailing dashes
    let mut result = String::new();
    let mut prev_dash = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_dash {
                result.push(c);
            }
            prev_dash = true;
        } else {
            result.push(c);
            prev_dash = false;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Derive a session slug from the task text, bounded to 15-50 characters.
///
/// Long slugs are truncated at a word boundary; short slugs are padded with
/// a fixed suffix so the generated id always matches the session-id pattern.
pub fn session_slug(task: &str) -> String {
    let mut result = slugify(task);

    if result.is_empty() {
        result = "untitled".to_string();
    }

    if result.len() > MAX_SLUG_LENGTH {
        // Prefer breaking at a word boundary, but never go below the minimum
        match result[..MAX_SLUG_LENGTH].rfind('-') {
            Some(pos) if pos >= MIN_SLUG_LENGTH => result.truncate(pos),
            _ => result.truncate(MAX_SLUG_LENGTH),
        }
        if result.ends_with('-') {
            result.pop();
        }
    }

    if result.len() < MIN_SLUG_LENGTH {
        result.push_str(PAD_SUFFIX);
        result.truncate(MAX_SLUG_LENGTH);
    }

    result
}

/// Generate a new session id for a task: UTC minute-precision prefix + slug.
pub fn generate_session_id(task: &str) -> String {
    let prefix = Utc::now().format("%Y-%m-%d-%H-%M");
    format!("{}-{}", prefix, session_slug(task))
}

/// Validate a session id against the canonical pattern.
pub fn is_valid_session_id(id: &str) -> bool {
    SESSION_ID_RE.is_match(id)
}
