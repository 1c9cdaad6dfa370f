//! The worker driver (§4.5) — runs one task directory's instructions
//! through the Agent Loop with a worker-scoped tool context and leaves the
//! task record in a terminal state.
//!
//! Grounded on `src/scheduler.rs`'s `execute_task`/`process_next_task`,
//! which already implement "read a task, transition to processing, run a
//! bounded agentic loop, write back a terminal status" against the
//! Postgres-backed store; this keeps that shape but drives the generic
//! Agent Loop and reads/writes the filesystem task record from
//! `crate::task`.

use tracing::{info, warn};

use crate::agent_loop::run_agent_loop;
use crate::error::Result;
use crate::hooks::ComposedHooks;
use crate::message::Message;
use crate::provider::Provider;
use crate::task::{Task, TaskStatus, TaskStore};
use crate::tools::{ToolContext, ToolRegistry};
use std::path::Path;

/// The worker driver's return value (§4.5 contract).
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Joins non-empty prompt sections with blank lines. Skill/profile
/// discovery and the host behavior guide are assembled by the caller and
/// passed in as plain strings — true external collaborators this function
/// does not know about.
pub fn compose_worker_prompt(sections: &[&str]) -> String {
    sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn task_heading(task: &Task) -> String {
    format!("## Task: {}\n\n{}", task.name, task.instructions)
}

/// Runs one task directory to completion (§4.5 steps 1-7). `prompt_sections`
/// are the caller-assembled external sections (host behavior guide, skill
/// summaries, protocol instructions, working-directory reminder); the task
/// heading is appended automatically as the final section.
pub async fn run_worker(
    store: &TaskStore,
    task_dir: &Path,
    tools: &ToolRegistry,
    provider: &dyn Provider,
    base_ctx: &ToolContext,
    prompt_sections: &[&str],
    hooks: &ComposedHooks,
) -> Result<WorkerOutcome> {
    let task = store.read(task_dir).await?;
    store.transition(task_dir, TaskStatus::Running).await?;
    info!(task_id = %task.id, "worker starting");

    let heading = task_heading(&task);
    let mut sections: Vec<&str> = prompt_sections.to_vec();
    sections.push(&heading);
    let system_prompt = compose_worker_prompt(&sections);

    let worker_ctx = base_ctx.for_worker(task_dir);
    let mut messages = vec![Message::user(task.instructions.clone())];

    match run_agent_loop(&mut messages, tools, provider, &worker_ctx, Some(&system_prompt), hooks).await {
        Ok(final_message) => {
            let result_text = final_message.text();
            store.write_result(task_dir, &result_text).await?;
            store.transition(task_dir, TaskStatus::Completed).await?;
            info!(task_id = %task.id, "worker completed");
            Ok(WorkerOutcome {
                task_id: task.id,
                status: TaskStatus::Completed,
                result: Some(result_text),
                error: None,
            })
        }
        Err(err) => {
            // §4.5 step 7: `Aborted` is treated as a normal failure here —
            // the `aborted` status is a separate side-effect of the abort
            // tool, not of the driver (§9 open question, resolved toward
            // the reference behavior — see DESIGN.md).
            warn!(task_id = %task.id, error = %err, "worker failed");
            let message = format!("Error: {err}");
            store.write_result(task_dir, &message).await?;
            store.transition(task_dir, TaskStatus::Failed).await?;
            Ok(WorkerOutcome {
                task_id: task.id,
                status: TaskStatus::Failed,
                result: None,
                error: Some(err.to_string()),
            })
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

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<Message> {
            Ok(Message::assistant_text(self.reply.clone()))
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

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[WireTool],
            _system_prompt: Option<&str>,
        ) -> Result<Message> {
            Err(Error::Provider("down".into()))
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

    #[test]
    fn compose_worker_prompt_skips_blank_sections() {
        let joined = compose_worker_prompt(&["first", "", "  ", "second"]);
        assert_eq!(joined, "first\n\nsecond");
    }

    #[tokio::test]
    async fn successful_run_writes_result_and_completes() {
        let root = tempdir().unwrap();
        let store = TaskStore::new(root.path());
        let dir = store.create("demo", "desc", "do the thing", None, &[]).await.unwrap();

        let tools = ToolRegistry::new();
        let provider = StubProvider {
            reply: "All done".into(),
        };
        let base_ctx = ToolContext::new(root.path(), root.path());
        let hooks = ComposedHooks::new(vec![]);

        let outcome = run_worker(&store, &dir, &tools, &provider, &base_ctx, &["guide"], &hooks)
            .await
            .unwrap();

        assert_eq!(outcome.status, TaskStatus::Completed);
        assert_eq!(outcome.result.as_deref(), Some("All done"));

        let on_disk = store.read(&dir).await.unwrap();
        assert_eq!(on_disk.status, TaskStatus::Completed);
        let result_file = tokio::fs::read_to_string(dir.join("result.md")).await.unwrap();
        assert_eq!(result_file, "All done");
    }

    #[tokio::test]
    async fn failed_run_writes_error_and_fails() {
        let root = tempdir().unwrap();
        let store = TaskStore::new(root.path());
        let dir = store.create("demo", "desc", "do the thing", None, &[]).await.unwrap();

        let tools = ToolRegistry::new();
        let base_ctx = ToolContext::new(root.path(), root.path());
        let hooks = ComposedHooks::new(vec![]);

        let outcome = run_worker(&store, &dir, &tools, &FailingProvider, &base_ctx, &[], &hooks)
            .await
            .unwrap();

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert!(outcome.error.unwrap().contains("down"));

        let on_disk = store.read(&dir).await.unwrap();
        assert_eq!(on_disk.status, TaskStatus::Failed);
        let result_file = tokio::fs::read_to_string(dir.join("result.md")).await.unwrap();
        assert!(result_file.starts_with("Error:"));
    }

    #[tokio::test]
    async fn worker_scoped_context_is_confined_to_the_task_directory() {
        let root = tempdir().unwrap();
        let store = TaskStore::new(root.path());
        let dir = store.create("demo", "desc", "go", None, &[]).await.unwrap();

        let tools = ToolRegistry::new();
        let provider = StubProvider { reply: "ok".into() };
        let base_ctx = ToolContext::new(root.path(), root.path());
        let hooks = ComposedHooks::new(vec![]);

        run_worker(&store, &dir, &tools, &provider, &base_ctx, &[], &hooks)
            .await
            .unwrap();

        assert!(base_ctx.write_root.is_none());
    }
}
