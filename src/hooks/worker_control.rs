//! Worker control adapter (§4.4.3) — the abort flag and steer-message queue
//! that let the runtime orchestrator reach into a running background
//! worker's Agent Loop.
//!
//! Grounded on `src/scheduler.rs`'s task cancellation handling (an
//! `Arc<AtomicBool>`-style flag checked between scheduler ticks) and on
//! `tools/task.rs`'s `cancel` action, which reaches into shared task state
//! from inside a tool call the same way `on_steer`/`on_abort` do here; this
//! hook is the receiving end of that same pattern.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::AgentHooks;
use crate::error::Error;
use crate::message::Message;
use crate::tools::{ToolCall, ToolResult};

/// The half of worker control the runtime orchestrator holds: it can signal
/// abort or enqueue a steer message without touching the worker's loop
/// directly (§4.6 `getControl`).
#[derive(Clone)]
pub struct WorkerHandle {
    abort: Arc<AtomicBool>,
    steer_tx: mpsc::UnboundedSender<String>,
}

impl WorkerHandle {
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Enqueues a message to be injected as a `User` turn at the next turn
    /// boundary. Silently dropped if the worker's loop has already ended.
    pub fn steer(&self, message: impl Into<String>) {
        let _ = self.steer_tx.send(message.into());
    }
}

/// The half installed into the worker's Agent Loop as a hook-set.
pub struct WorkerControl {
    task_id: String,
    abort: Arc<AtomicBool>,
    steer_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl WorkerControl {
    /// Builds a connected handle/hook-set pair for one worker run (§4.5 step 2).
    pub fn pair(task_id: impl Into<String>) -> (Arc<WorkerControl>, WorkerHandle) {
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        let control = Arc::new(WorkerControl {
            task_id: task_id.into(),
            abort: abort.clone(),
            steer_rx: tokio::sync::Mutex::new(rx),
        });
        let handle = WorkerHandle {
            abort,
            steer_tx: tx,
        };
        (control, handle)
    }

    /// Checked by the Agent Loop at each turn boundary (§4.3 step 3,
    /// §7 category 3: an abort surfaces as `Error::Aborted`).
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    fn drain_steer_messages(&self) -> Vec<String> {
        let mut rx = match self.steer_rx.try_lock() {
            Ok(rx) => rx,
            Err(_) => return Vec::new(),
        };
        let mut drained = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
        drained
    }
}

#[async_trait]
impl AgentHooks for WorkerControl {
    /// Checked between every tool execution (§5 "cancellation is checked
    /// between tool executions, not preemptive"): if the handle's abort flag
    /// is set, raises `Aborted` instead of letting the result through.
    async fn on_tool_end(
        &self,
        _call: &ToolCall,
        result: ToolResult,
        _duration_ms: u64,
    ) -> crate::error::Result<ToolResult> {
        if self.is_aborted() {
            return Err(Error::Aborted(self.task_id.clone()));
        }
        Ok(result)
    }

    async fn on_turn_end(&self, messages: &mut Vec<Message>) {
        for steer in self.drain_steer_messages() {
            messages.push(Message::user(format!("[Steer] {steer}")));
        }
    }
}
