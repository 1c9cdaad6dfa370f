//! The runtime orchestrator (§4.6) — owns the main conversation history,
//! constructs hook stacks per invocation, owns the live worker
//! control-handle map, and spawns worker drivers as fire-and-forget
//! background computations, injecting their completion notifications back
//! into the main agent's next turn.
//!
//! Grounded on the teacher's `src/scheduler.rs` (`Scheduler` owns stores,
//! provider, and tool registry, exposes `run`/`tick`) and
//! `src/agent/conversation.rs` (`ConversationManager` owns live state behind
//! a lock): `Runtime` follows the same "owns `Arc`'d collaborators, async
//! methods take `&self`" shape. Background spawns use `tokio::spawn`,
//! matching `scheduler.rs::run`'s own use of a `tokio::time::interval` loop
//! spawned onto the runtime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::agent_loop::run_agent_loop;
use crate::error::Result;
use crate::hooks::{AgentHooks, Compaction, CompactionConfig, ComposedHooks, Tracer, WorkerControl, WorkerHandle};
use crate::message::Message;
use crate::provider::Provider;
use crate::task::TaskStore;
use crate::tools::{OnAbort, OnSteer, OnTaskCreated, ToolContext, ToolRegistry};
use crate::worker::run_worker;

/// A delta sink wired in as a hook for the duration of one `on_user_message`
/// call, per §4.6 ("if `onTextDelta` is supplied, wrap it as a hook"). Never
/// suspends, matching the synchrony rule in §4.2/§9.
struct TextDeltaSink(Arc<dyn Fn(&str) + Send + Sync>);

#[async_trait::async_trait]
impl AgentHooks for TextDeltaSink {
    fn on_text_delta(&self, fragment: &str) {
        (self.0)(fragment);
    }
    fn has_text_delta_handler(&self) -> bool {
        true
    }
}

/// Everything the orchestrator needs, built once and shared behind `Arc`.
pub struct Runtime {
    provider: Arc<dyn Provider>,
    model: String,
    main_tools: ToolRegistry,
    worker_tools: ToolRegistry,
    base_ctx: ToolContext,
    main_system_prompt: String,
    worker_prompt_sections: Vec<String>,
    store: TaskStore,
    trace_dir: Option<PathBuf>,
    compaction_config: CompactionConfig,
    controls: tokio::sync::Mutex<HashMap<String, WorkerHandle>>,
    history: tokio::sync::Mutex<Vec<Message>>,
}

impl Runtime {
    /// Builds the runtime and wires the tool-context callbacks back to it
    /// (§4.6 "Tool↔runtime wiring"). Uses `Arc::new_cyclic` to break the
    /// cyclic ownership between the runtime and the context it hands to its
    /// own tools (§9 "late-binding step, not a hidden dependency").
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        main_tools: ToolRegistry,
        worker_tools: ToolRegistry,
        tasks_root: impl Into<PathBuf>,
        main_system_prompt: impl Into<String>,
        worker_prompt_sections: Vec<String>,
        trace_dir: Option<PathBuf>,
        compaction_config: CompactionConfig,
    ) -> Arc<Runtime> {
        let tasks_root = tasks_root.into();

        Arc::new_cyclic(|weak: &Weak<Runtime>| {
            let on_task_created: OnTaskCreated = {
                let weak = weak.clone();
                Arc::new(move |dir: PathBuf| {
                    if let Some(runtime) = weak.upgrade() {
                        tokio::spawn(async move { runtime.spawn_worker(dir).await });
                    }
                })
            };
            let on_steer: OnSteer = {
                let weak = weak.clone();
                Arc::new(move |task_id: String, message: String| {
                    if let Some(runtime) = weak.upgrade() {
                        tokio::spawn(async move {
                            if let Some(handle) = runtime.get_control(&task_id).await {
                                handle.steer(message);
                            }
                        });
                    }
                })
            };
            let on_abort: OnAbort = {
                let weak = weak.clone();
                Arc::new(move |task_id: String| {
                    if let Some(runtime) = weak.upgrade() {
                        tokio::spawn(async move {
                            if let Some(handle) = runtime.get_control(&task_id).await {
                                handle.abort();
                            }
                        });
                    }
                })
            };

            let base_ctx = ToolContext {
                cwd: tasks_root.clone(),
                tasks_root: tasks_root.clone(),
                write_root: None,
                on_task_created: Some(on_task_created),
                on_steer: Some(on_steer),
                on_abort: Some(on_abort),
            };

            Runtime {
                provider,
                model: model.into(),
                main_tools,
                worker_tools,
                base_ctx,
                main_system_prompt: main_system_prompt.into(),
                worker_prompt_sections,
                store: TaskStore::new(tasks_root),
                trace_dir,
                compaction_config,
                controls: tokio::sync::Mutex::new(HashMap::new()),
                history: tokio::sync::Mutex::new(Vec::new()),
            }
        })
    }

    fn build_hooks(&self, extra: Vec<Arc<dyn AgentHooks>>) -> ComposedHooks {
        let mut hooks: Vec<Arc<dyn AgentHooks>> = vec![Arc::new(Compaction::new(
            self.provider.clone(),
            self.compaction_config,
        ))];
        if let Some(dir) = &self.trace_dir {
            hooks.push(Arc::new(Tracer::for_directory(dir.clone(), self.model.clone())));
        }
        hooks.extend(extra);
        ComposedHooks::new(hooks)
    }

    /// Appends `text` to the main history and runs the Agent Loop against
    /// it, holding the history lock for the full call — the reference
    /// serialization strategy from §5 ("queueing at the implementation
    /// layer"): a worker-completion notification arriving mid-turn simply
    /// waits for this lock rather than racing the live turn.
    pub async fn on_user_message(
        self: &Arc<Self>,
        text: impl Into<String>,
        on_text_delta: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    ) -> Result<Message> {
        let mut history = self.history.lock().await;
        history.push(Message::user(text));

        let extra: Vec<Arc<dyn AgentHooks>> = match on_text_delta {
            Some(sink) => vec![Arc::new(TextDeltaSink(sink))],
            None => Vec::new(),
        };
        let hooks = self.build_hooks(extra);

        run_agent_loop(
            &mut history,
            &self.main_tools,
            self.provider.as_ref(),
            &self.base_ctx,
            Some(&self.main_system_prompt),
            &hooks,
        )
        .await
    }

    pub async fn get_control(&self, task_id: &str) -> Option<WorkerHandle> {
        self.controls.lock().await.get(task_id).cloned()
    }

    /// Starts a worker driver in the background and returns immediately
    /// (§4.6 "spawnWorker — fire and forget"). On completion, removes the
    /// control handle and injects a synthesized notification into the main
    /// history via a recursive `on_user_message` call.
    pub async fn spawn_worker(self: &Arc<Self>, task_dir: PathBuf) {
        let task_id = task_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let (control_hooks, handle) = WorkerControl::pair(task_id.clone());
        self.controls.lock().await.insert(task_id.clone(), handle);

        let hooks = self.build_hooks(vec![control_hooks]);
        let sections: Vec<&str> = self.worker_prompt_sections.iter().map(String::as_str).collect();

        let outcome = run_worker(
            &self.store,
            &task_dir,
            &self.worker_tools,
            self.provider.as_ref(),
            &self.base_ctx,
            &sections,
            &hooks,
        )
        .await;

        self.controls.lock().await.remove(&task_id);

        let notification = match outcome {
            Ok(outcome) => match outcome.result {
                Some(result) => format!(
                    "[Task {} completed. Status: {}]\nResult: {}",
                    outcome.task_id,
                    outcome.status.as_str(),
                    result
                ),
                None => format!(
                    "[Task {} completed. Status: {}]\nError: {}",
                    outcome.task_id,
                    outcome.status.as_str(),
                    outcome.error.unwrap_or_default()
                ),
            },
            Err(err) => format!("[Task {task_id} failed unexpectedly: {err}]"),
        };

        if let Err(err) = self.on_user_message(notification, None).await {
            warn!(task_id = %task_id, error = %err, "failed to inject worker completion notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::EventStream;
    use crate::tools::WireTool;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<Message> {
            let last = messages.last().map(Message::text).unwrap_or_default();
            Ok(Message::assistant_text(format!("echo: {last}")))
        }
        async fn stream(
            &self,
            _messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<EventStream> {
            unimplemented!()
        }
    }

    fn runtime(root: &std::path::Path) -> Arc<Runtime> {
        Runtime::new(
            Arc::new(EchoProvider),
            "echo-1",
            ToolRegistry::new(),
            ToolRegistry::new(),
            root.to_path_buf(),
            "you are a helpful assistant",
            vec!["worker guide".to_string()],
            None,
            CompactionConfig::default(),
        )
    }

    #[tokio::test]
    async fn on_user_message_runs_the_loop_and_appends_history() {
        let root = tempdir().unwrap();
        let rt = runtime(root.path());
        let reply = rt.on_user_message("hello", None).await.unwrap();
        assert_eq!(reply.text(), "echo: hello");
    }

    #[tokio::test]
    async fn get_control_is_none_for_unknown_task() {
        let root = tempdir().unwrap();
        let rt = runtime(root.path());
        assert!(rt.get_control("t_999").await.is_none());
    }

    #[tokio::test]
    async fn spawn_worker_runs_to_completion_and_notifies_main_history() {
        let root = tempdir().unwrap();
        let rt = runtime(root.path());
        let store = TaskStore::new(root.path());
        let dir = store.create("demo", "desc", "say hi", None, &[]).await.unwrap();

        rt.spawn_worker(dir.clone()).await;

        assert!(rt.get_control(dir.file_name().unwrap().to_str().unwrap()).await.is_none());

        let task = store.read(&dir).await.unwrap();
        assert_eq!(task.status.as_str(), "completed");

        let history = rt.history.lock().await;
        let notification = history.last().unwrap().text();
        assert!(notification.contains("Task t_001 completed"));
        assert!(notification.contains("echo: say hi"));
    }

    #[test]
    fn fails_to_compile_without_error_type_used() {
        let _ = Error::Internal("keep Error import alive for doc examples".into());
    }
}
