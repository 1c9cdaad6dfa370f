//! Tool definition and execution system (§4.1).
//!
//! Each tool implements the `Tool` trait and is registered into a
//! `ToolRegistry`, which the Agent Loop converts to wire form once per
//! invocation.

mod context;
mod registry;
mod schema;
mod traits;

pub use context::{OnAbort, OnSteer, OnTaskCreated, ToolContext};
pub use registry::ToolRegistry;
pub use schema::{ParamSchema, PropertyType, ValidationError};
pub use traits::{Tool, ToolCall, ToolResult, WireTool};
