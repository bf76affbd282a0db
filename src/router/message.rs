//! Model request/response message types and prompt rendering.
//!
//! The backing service accepts a single prompt string, so role-structured
//! messages are flattened: each message is prefixed with its capitalized
//! role, multipart text is joined with a single space, and messages are
//! separated by a blank line. The rendering is lossy for non-text parts,
//! which the core does not use.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::System => "System:",
            Role::User => "User:",
            Role::Assistant => "Assistant:",
        }
    }
}

/// One part of a request message. Only text is rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
}

/// A role-tagged request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl ModelMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    fn rendered_text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MessagePart::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render messages into the single prompt string the service accepts.
pub fn render_prompt(messages: &[ModelMessage]) -> String {
    messages
        .iter()
        .map(|msg| format!("{} {}", msg.role.prefix(), msg.rendered_text()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One part of a model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePart {
    Text {
        text: String,
    },
    /// Tool-call-style structured result bridged from a JSON response body
    ToolCall {
        name: String,
        arguments: Value,
    },
}

/// Estimated token usage for a request/response pair.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Estimate tokens as serialized length / 4; no counting endpoint is called.
pub fn estimate_tokens(serialized: &str) -> u64 {
    (serialized.len() / 4) as u64
}

/// A completed model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model: String,
    pub parts: Vec<ResponsePart>,
    pub usage: Usage,
}

impl ModelResponse {
    /// Concatenated text content of all text parts.
    pub fn as_concat_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ResponsePart::Text { text } => Some(text.as_str()),
                ResponsePart::ToolCall { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Arguments of the first tool-call part with the given name, if any.
    pub fn tool_call_arguments(&self, name: &str) -> Option<&Value> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::ToolCall {
                name: part_name,
                arguments,
            } if part_name == name => Some(arguments),
            _ => None,
        })
    }
}
