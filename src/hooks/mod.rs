//! Lifecycle hook framework (§4.2) — nine optional observation/mutation
//! points on the Agent Loop, folded into one `ComposedHooks` the loop calls
//! without knowing which adapters are installed.
//!
//! Grounded on the teacher's `LoopCallback` trait in
//! `src/agent/agentic_loop.rs` (an `async_trait` with four no-op-default
//! callbacks: `on_iteration_start`, `on_tool_executed`, `on_iteration_end`,
//! `on_loop_complete`) generalized to the spec's nine-hook table and to the
//! `onToolEnd` result-replacement and `onTextDelta` streaming-selection
//! rules that the teacher's narrower callback doesn't need.

pub mod compaction;
pub mod tracer;
pub mod worker_control;

pub use compaction::{Compaction, CompactionConfig};
pub use tracer::{LazyTraceFile, Tracer};
pub use worker_control::{WorkerControl, WorkerHandle};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Error;
use crate::message::Message;
use crate::tools::{ToolCall, ToolResult};

/// One installed hook-set. Every method has a no-op default; adapters
/// override only the hooks they care about.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    async fn on_loop_start(&self) {}
    async fn on_loop_end(&self, _turns: u32) {}
    async fn on_llm_start(&self, _messages: &[Message]) {}
    async fn on_llm_end(&self, _message: &Message, _duration_ms: u64) {}
    async fn on_tool_start(&self, _call: &ToolCall) {}
    /// Returns the result to carry forward — either the input result
    /// unchanged or a replacement, per the chaining rule in §4.2. May fail
    /// (the worker-control adapter raises `Aborted` here); a failure
    /// propagates out of the Agent Loop like any other fatal error.
    async fn on_tool_end(
        &self,
        _call: &ToolCall,
        result: ToolResult,
        _duration_ms: u64,
    ) -> crate::error::Result<ToolResult> {
        Ok(result)
    }
    async fn on_turn_end(&self, _messages: &mut Vec<Message>) {}
    /// Must never suspend (§4.2, §5, §9): called synchronously from inside
    /// the streaming iterator the main loop is driving.
    fn on_text_delta(&self, _fragment: &str) {}
    async fn on_error(&self, _err: &Error) {}
    /// Whether this hook-set supplies a non-default `on_text_delta`. The
    /// combined predicate determines whether the loop opens a streaming or
    /// blocking provider call (§4.2 rule, §4.3 step 3b, §8 property 7).
    fn has_text_delta_handler(&self) -> bool {
        false
    }
}

/// Folds several hook-sets into one, running each sequentially in
/// installation order and threading `on_tool_end`'s result between them.
pub struct ComposedHooks {
    hooks: Vec<Arc<dyn AgentHooks>>,
    has_text_delta: bool,
}

impl ComposedHooks {
    pub fn new(hooks: Vec<Arc<dyn AgentHooks>>) -> Self {
        let has_text_delta = hooks.iter().any(|h| h.has_text_delta_handler());
        Self {
            hooks,
            has_text_delta,
        }
    }

    pub fn has_text_delta_handler(&self) -> bool {
        self.has_text_delta
    }

    pub async fn on_loop_start(&self) {
        for h in &self.hooks {
            h.on_loop_start().await;
        }
    }

    pub async fn on_loop_end(&self, turns: u32) {
        for h in &self.hooks {
            h.on_loop_end(turns).await;
        }
    }

    pub async fn on_llm_start(&self, messages: &[Message]) {
        for h in &self.hooks {
            h.on_llm_start(messages).await;
        }
    }

    pub async fn on_llm_end(&self, message: &Message, duration_ms: u64) {
        for h in &self.hooks {
            h.on_llm_end(message, duration_ms).await;
        }
    }

    pub async fn on_tool_start(&self, call: &ToolCall) {
        for h in &self.hooks {
            h.on_tool_start(call).await;
        }
    }

    /// Each handler receives the (possibly-replaced) result of the previous
    /// one; the final value is what the loop appends to history (§4.2, §8
    /// property 6). Stops and propagates on the first handler that fails.
    pub async fn on_tool_end(
        &self,
        call: &ToolCall,
        mut result: ToolResult,
        duration_ms: u64,
    ) -> crate::error::Result<ToolResult> {
        for h in &self.hooks {
            result = h.on_tool_end(call, result, duration_ms).await?;
        }
        Ok(result)
    }

    pub async fn on_turn_end(&self, messages: &mut Vec<Message>) {
        for h in &self.hooks {
            h.on_turn_end(messages).await;
        }
    }

    /// Runs every handler's `on_text_delta` synchronously, in installation
    /// order (§4.2).
    pub fn on_text_delta(&self, fragment: &str) {
        for h in &self.hooks {
            h.on_text_delta(fragment);
        }
    }

    pub async fn on_error(&self, err: &Error) {
        for h in &self.hooks {
            h.on_error(err).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl AgentHooks for Recorder {
        async fn on_tool_end(
            &self,
            _call: &ToolCall,
            result: ToolResult,
            _duration_ms: u64,
        ) -> crate::error::Result<ToolResult> {
            self.calls.lock().unwrap().push("first");
            Ok(ToolResult::success(format!("{}+first", result.content)))
        }
    }

    struct Second {
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AgentHooks for Second {
        async fn on_tool_end(
            &self,
            _call: &ToolCall,
            result: ToolResult,
            _duration_ms: u64,
        ) -> crate::error::Result<ToolResult> {
            self.calls.lock().unwrap().push("second");
            Ok(ToolResult::success(format!("{}+second", result.content)))
        }
    }

    #[tokio::test]
    async fn on_tool_end_chains_results_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let second = Arc::new(Second {
            calls: calls.clone(),
        });
        let composed = ComposedHooks::new(vec![first, second]);
        let call = ToolCall {
            id: "1".into(),
            name: "mock".into(),
            arguments: Default::default(),
        };
        let result = composed
            .on_tool_end(&call, ToolResult::success("base"), 0)
            .await
            .unwrap();
        assert_eq!(result.content, "base+first+second");
        assert_eq!(*calls.lock().unwrap(), vec!["second"]);
    }

    struct TextDeltaHook {
        count: AtomicUsize,
    }

    #[async_trait]
    impl AgentHooks for TextDeltaHook {
        fn on_text_delta(&self, _fragment: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        fn has_text_delta_handler(&self) -> bool {
            true
        }
    }

    #[test]
    fn composed_predicate_reflects_any_installed_handler() {
        let plain = ComposedHooks::new(vec![Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        })]);
        assert!(!plain.has_text_delta_handler());

        let with_delta = ComposedHooks::new(vec![Arc::new(TextDeltaHook {
            count: AtomicUsize::new(0),
        })]);
        assert!(with_delta.has_text_delta_handler());
    }
}
