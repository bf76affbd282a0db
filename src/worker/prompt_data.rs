//! Structured context parsed from a worker's prompt file.
//!
//! Queen-generated prompts carry a frontmatter block between `---` markers
//! with the assignment's coordination fields. The values are free text (task
//! focus sentences contain colons), so parsing is lenient and line-based:
//! anything that does not parse falls back to its default.

use crate::models::Priority;

/// Coordination context recovered from a prompt file.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskContext {
    pub worker_type: String,
    pub session_id: String,
    pub task_focus: String,
    pub priority: Priority,
    pub estimated_duration: String,
    pub complexity_level: u8,
    pub dependencies: Vec<String>,
    pub focus_areas: Vec<String>,
}

impl Default for TaskContext {
    fn default() -> Self {
        Self {
            worker_type: String::new(),
            session_id: String::new(),
            task_focus: String::new(),
            priority: Priority::Medium,
            estimated_duration: "1-2h".to_string(),
            complexity_level: 1,
            dependencies: Vec::new(),
            focus_areas: Vec::new(),
        }
    }
}

impl TaskContext {
    /// Parse the frontmatter block of a prompt file.
    ///
    /// Returns defaults for any missing or malformed field; a prompt without
    /// frontmatter yields the full default context.
    pub fn parse(prompt: &str) -> Self {
        let mut context = TaskContext::default();

        let Some(frontmatter) = extract_frontmatter(prompt) else {
            return context;
        };

        for line in frontmatter.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "worker_type" => context.worker_type = value.to_string(),
                "session_id" => context.session_id = value.to_string(),
                "task_focus" => context.task_focus = value.to_string(),
                "priority" => {
                    if let Some(priority) = parse_priority(value) {
                        context.priority = priority;
                    }
                }
                "estimated_duration" => context.estimated_duration = value.to_string(),
                "complexity_level" => {
                    if let Ok(level) = value.parse::<u8>() {
                        context.complexity_level = level.clamp(1, 4);
                    }
                }
                "dependencies" => context.dependencies = parse_list(value),
                "focus_areas" => context.focus_areas = parse_list(value),
                _ => {}
            }
        }

        context
    }
}

/// Content between the leading `---` markers, if present.
fn extract_frontmatter(prompt: &str) -> Option<&str> {
    let rest = prompt.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "critical" => Some(Priority::Critical),
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

/// Parse a `[a, b, c]` flow list; an empty list yields no items.
fn parse_list(value: &str) -> Vec<String> {
    let inner = value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
