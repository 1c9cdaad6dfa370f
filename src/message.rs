//! Conversation message model — the common vocabulary shared by the Agent
//! Loop, the hook adapters, the worker driver, and the runtime orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in a conversation history.
///
/// Invariant: within any `Assistant` message, every `ToolCall` block carries
/// a distinct `id` — the id is later used to bind the matching `ToolResult`
/// message back to its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// A plain-text message from the human operator (or, for workers, the
    /// synthesized initial instructions / steer messages).
    User { content: String },
    /// An ordered list of content blocks produced by the model in one turn.
    Assistant { content: Vec<ContentBlock> },
    /// The result of executing one tool call, referencing it by id.
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: vec![ContentBlock::Text(content.into())],
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Message::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error,
        }
    }

    /// Collect the tool-call blocks of an `Assistant` message, in order. Empty
    /// for `User`/`ToolResult` messages and for assistant messages with no
    /// tool calls.
    pub fn tool_calls(&self) -> Vec<&ToolCallBlock> {
        match self {
            Message::Assistant { content } => content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolCall(tc) => Some(tc),
                    ContentBlock::Text(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Concatenate the text blocks of an `Assistant` message. Used by the
    /// worker driver to build `result.md` (§4.5 step 6).
    pub fn text(&self) -> String {
        match self {
            Message::Assistant { content } => content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text(t) => Some(t.as_str()),
                    ContentBlock::ToolCall(_) => None,
                })
                .collect::<Vec<_>>()
                .join(""),
            Message::User { content } => content.clone(),
            Message::ToolResult { content, .. } => content.clone(),
        }
    }
}

/// A single unit of content within an `Assistant` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(String),
    ToolCall(ToolCallBlock),
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Map<String, Value>,
}
