//! Tool registry — the set of tools installed in one Agent Loop invocation.
//!
//! Grounded on the teacher's `src/tools/registry.rs`: a `HashMap<String, Box<dyn Tool>>`
//! with `register`/`get`/`definitions`, generalized so the wire definitions
//! can be computed once up front (§4.3 step 1) instead of per call.

use std::collections::HashMap;
use std::sync::Arc;

use super::context::ToolContext;
use super::traits::{Tool, ToolCall, ToolResult, WireTool};
use crate::error::Result;

/// Registry of tools available to one Agent Loop invocation.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// The wire form of every installed tool, computed once per loop
    /// invocation (§4.3 step 1).
    pub fn wire_definitions(&self) -> Vec<WireTool> {
        self.tools.values().map(|t| t.to_wire()).collect()
    }

    /// Execute a single tool call against this registry. Does not perform
    /// schema validation or truncation — that is the Agent Loop's job
    /// (§4.3e); this method is the raw dispatch the loop wraps.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone(), ctx).await,
            None => Ok(ToolResult::failure("Tool not found")),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
