//! # picoagent
//!
//! A personal AI-assistant runtime: a tool-calling agent loop, a composable
//! lifecycle-hook framework, and a runtime orchestrator for background
//! worker agents.
//!
//! ## Architecture
//!
//! - **Messages and tools** (`message`, `tools`): the wire model shared by
//!   every provider and every tool call.
//! - **Providers** (`provider`): the abstract LLM backend interface — one
//!   blocking `complete` call, one streaming `stream` call.
//! - **Agent Loop** (`agent_loop`): the tool-calling turn loop — call the
//!   provider, dispatch any tool calls, feed results back, repeat until the
//!   provider stops calling tools.
//! - **Hooks** (`hooks`): nine lifecycle callbacks folded into one
//!   `ComposedHooks`, plus three adapters built on them — `Tracer` (JSONL
//!   spans), `Compaction` (context-window rollup), and `WorkerControl`
//!   (abort/steer plumbing for background workers).
//! - **Tasks** (`task`): the on-disk `t_NNN` task-directory format backing
//!   background work.
//! - **Worker driver** (`worker`): runs one task directory's instructions
//!   through the Agent Loop to a terminal status.
//! - **Runtime** (`runtime`): owns the main conversation and the live
//!   worker control-handle map, and wires task-lifecycle callbacks back
//!   from tools to itself.
//! - **Configuration** (`config`): default task/trace directory resolution.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use picoagent::{Runtime, CompactionConfig};
//! use picoagent::tools::ToolRegistry;
//!
//! # async fn run(provider: Arc<dyn picoagent::provider::Provider>) -> picoagent::Result<()> {
//! let runtime = Runtime::new(
//!     provider,
//!     "gpt-5",
//!     ToolRegistry::new(),
//!     ToolRegistry::new(),
//!     picoagent::config::default_tasks_root(),
//!     "you are a helpful assistant",
//!     vec![],
//!     picoagent::config::default_trace_dir(),
//!     CompactionConfig::default(),
//! );
//! let reply = runtime.on_user_message("hello", None).await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod hooks;
pub mod message;
pub mod provider;
pub mod runtime;
pub mod task;
pub mod tools;
pub mod worker;

pub use error::{Error, Result};
pub use hooks::{Compaction, CompactionConfig, ComposedHooks, Tracer};
pub use message::Message;
pub use provider::Provider;
pub use runtime::Runtime;
pub use task::{Task, TaskStatus, TaskStore};
