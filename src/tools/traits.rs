//! Core tool trait and result/call types.
//!
//! Grounded on the teacher's `src/tools/traits.rs` (`Tool`, `ToolResult`,
//! `ToolCall`): the trait shape — name/description/schema/execute plus a
//! `to_definition()` default method — carries over unchanged; `execute` now
//! also receives the `ToolContext` (§4.1) and the schema is the rich
//! `ParamSchema` of §4.1 rather than a raw `serde_json::Value`.

use async_trait::async_trait;
use serde_json::Value;

use super::context::ToolContext;
use super::schema::ParamSchema;
use crate::error::Result;

/// A tool the LLM can call. Implementors provide a name, description, a
/// structured parameter schema, and an async `execute`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> &ParamSchema;

    /// Execute with already-validated arguments (the Agent Loop validates
    /// before calling `execute`; see §4.3e).
    async fn execute(&self, args: serde_json::Map<String, Value>, ctx: &ToolContext) -> Result<ToolResult>;

    /// The wire form sent to the LLM (§4.1): name, description, JSON-Schema.
    fn to_wire(&self) -> WireTool {
        WireTool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema().to_json_schema(),
        }
    }
}

/// The serialized form of a tool definition, as presented to the provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        ToolResult {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool call request extracted from an assistant message.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_constructors() {
        let ok = ToolResult::success("done");
        assert!(!ok.is_error);
        assert_eq!(ok.content, "done");

        let err = ToolResult::failure("boom");
        assert!(err.is_error);
    }
}
