//! Tool execution context — the handles a tool's `execute` needs, and the
//! three callbacks (`on_task_created`, `on_steer`, `on_abort`) through which
//! tools hand task-lifecycle events back to the runtime (§3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback invoked by a tool that creates a task directory. The runtime
/// installs this to trigger `Runtime::spawn_worker`.
pub type OnTaskCreated = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Callback invoked by a tool that steers a running worker.
pub type OnSteer = Arc<dyn Fn(String, String) + Send + Sync>;

/// Callback invoked by a tool that aborts a running worker.
pub type OnAbort = Arc<dyn Fn(String) + Send + Sync>;

/// Execution context passed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// Working directory for non-restricted tools.
    pub cwd: PathBuf,
    /// Root directory under which task directories (`t_NNN`) live.
    pub tasks_root: PathBuf,
    /// When set, all file-writing tools must refuse paths outside it.
    pub write_root: Option<PathBuf>,
    pub on_task_created: Option<OnTaskCreated>,
    pub on_steer: Option<OnSteer>,
    pub on_abort: Option<OnAbort>,
}

impl ToolContext {
    pub fn new(cwd: impl Into<PathBuf>, tasks_root: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            tasks_root: tasks_root.into(),
            write_root: None,
            on_task_created: None,
            on_steer: None,
            on_abort: None,
        }
    }

    /// Build the worker-scoped context: `cwd` and `write_root` both become
    /// the task directory (§4.5 step 3), callbacks are preserved unchanged.
    pub fn for_worker(&self, task_dir: impl Into<PathBuf>) -> Self {
        let task_dir = task_dir.into();
        Self {
            cwd: task_dir.clone(),
            tasks_root: self.tasks_root.clone(),
            write_root: Some(task_dir),
            on_task_created: self.on_task_created.clone(),
            on_steer: self.on_steer.clone(),
            on_abort: self.on_abort.clone(),
        }
    }

    /// Resolve `path` against `cwd` and, if `write_root` is set, refuse
    /// anything that would land outside it (§4.1, §8 property 13).
    pub fn resolve_write_path(&self, path: &str) -> Result<PathBuf, String> {
        let candidate = self.cwd.join(path);
        if let Some(root) = &self.write_root {
            if !is_within(&candidate, root) {
                return Err("Access denied: path outside write root".to_string());
            }
        }
        Ok(candidate)
    }
}

/// Lexical containment check: normalizes `..`/`.` components without
/// touching the filesystem, so the check also rejects escapes through paths
/// that don't exist yet (a plain `canonicalize`-based check would not).
fn is_within(candidate: &Path, root: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        let mut out = PathBuf::new();
        for component in p.components() {
            match component {
                std::path::Component::ParentDir => {
                    out.pop();
                }
                std::path::Component::CurDir => {}
                other => out.push(other),
            }
        }
        out
    };

    normalize(candidate).starts_with(normalize(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_path_outside_write_root() {
        let mut ctx = ToolContext::new("/tasks/t_001", "/tasks");
        ctx.write_root = Some(PathBuf::from("/tasks/t_001"));
        assert!(ctx.resolve_write_path("notes.md").is_ok());
        assert!(ctx.resolve_write_path("../t_002/notes.md").is_err());
        assert!(ctx.resolve_write_path("../../etc/passwd").is_err());
    }

    #[test]
    fn allows_any_path_without_write_root() {
        let ctx = ToolContext::new("/workspace", "/workspace/tasks");
        assert!(ctx.resolve_write_path("../anywhere.txt").is_ok());
    }

    #[test]
    fn for_worker_scopes_cwd_and_write_root_to_task_dir() {
        let base = ToolContext::new("/workspace", "/workspace/tasks");
        let worker = base.for_worker("/workspace/tasks/t_001");
        assert_eq!(worker.cwd, PathBuf::from("/workspace/tasks/t_001"));
        assert_eq!(worker.write_root, Some(PathBuf::from("/workspace/tasks/t_001")));
    }
}
