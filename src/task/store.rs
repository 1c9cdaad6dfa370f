//! Task directory store — allocation, creation, status transitions, and
//! result/progress writes for `t_NNN` directories under a tasks-root (§3
//! "Task record", §6 "Task directory on disk", §8 property 12).
//!
//! Grounded on the teacher's `src/database/tasks.rs` (pending→processing→
//! terminal lifecycle with `started_at`/`completed_at` timestamps set on
//! first transition) translated from SQL rows to frontmatter files, and on
//! `src/tools/task.rs`'s `TaskCreateTool` for the creation shape (name,
//! description, instructions body).

use chrono::Utc;
use std::path::{Path, PathBuf};

use super::frontmatter::{self, Frontmatter, Value};
use crate::error::{Error, Result};

const ID_PREFIX: &str = "t_";

/// Task lifecycle status (§3). Transitions: `Pending` → `Running` →
/// one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Aborted => "aborted",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "aborted" => Ok(TaskStatus::Aborted),
            other => Err(Error::Frontmatter(format!("unknown task status: {other}"))),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Aborted)
    }
}

/// An in-memory view of a task record read from disk.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub dir: PathBuf,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub instructions: String,
    pub model: Option<String>,
    pub tags: Vec<String>,
    /// RFC3339 creation timestamp, set once at `create` time.
    pub created: Option<String>,
    /// RFC3339 timestamp of the first `pending` → `running` transition.
    pub started: Option<String>,
    /// RFC3339 timestamp of the first transition into a terminal status.
    pub completed: Option<String>,
}

/// Filesystem-backed task store rooted at one `tasks_root` directory.
pub struct TaskStore {
    tasks_root: PathBuf,
}

impl TaskStore {
    pub fn new(tasks_root: impl Into<PathBuf>) -> Self {
        Self {
            tasks_root: tasks_root.into(),
        }
    }

    pub fn tasks_root(&self) -> &Path {
        &self.tasks_root
    }

    /// Allocates the next sequential task id by scanning existing `t_NNN`
    /// directories for the highest suffix (§6, §8 property 12).
    async fn next_id(&self) -> Result<u32> {
        let mut max = 0u32;
        let mut entries = match tokio::fs::read_dir(&self.tasks_root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(1),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(suffix) = name.strip_prefix(ID_PREFIX) {
                if let Ok(n) = suffix.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        Ok(max + 1)
    }

    /// Creates a new task directory with a `task.md` in `pending` status
    /// (§4.5 precondition). Returns the directory path.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        instructions: &str,
        model: Option<&str>,
        tags: &[String],
    ) -> Result<PathBuf> {
        let id = format!("{ID_PREFIX}{:03}", self.next_id().await?);
        let dir = self.tasks_root.join(&id);
        tokio::fs::create_dir_all(&dir).await?;

        let mut fm = Frontmatter::new();
        fm.set("id", Value::String(id.clone()));
        fm.set("name", Value::String(name.to_string()));
        fm.set("description", Value::String(description.to_string()));
        fm.set("status", Value::String(TaskStatus::Pending.as_str().to_string()));
        fm.set("created", Value::String(Utc::now().to_rfc3339()));
        if let Some(model) = model {
            fm.set("model", Value::String(model.to_string()));
        }
        if !tags.is_empty() {
            fm.set("tags", Value::Array(tags.to_vec()));
        }

        let document = format!("{}\n{}", fm.render(), instructions);
        tokio::fs::write(dir.join("task.md"), document).await?;
        Ok(dir)
    }

    pub async fn read(&self, dir: &Path) -> Result<Task> {
        let source = tokio::fs::read_to_string(dir.join("task.md")).await?;
        let (fm, body) = frontmatter::parse(&source)?;

        let id = fm
            .get_str("id")
            .ok_or_else(|| Error::Frontmatter("task.md missing id".into()))?
            .to_string();
        let name = fm.get_str("name").unwrap_or_default().to_string();
        let description = fm.get_str("description").unwrap_or_default().to_string();
        let status = TaskStatus::parse(fm.get_str("status").unwrap_or("pending"))?;
        let model = fm.get_str("model").map(str::to_string);
        let tags = match fm.get("tags") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let created = fm.get_str("created").map(str::to_string);
        let started = fm.get_str("started").map(str::to_string);
        let completed = fm.get_str("completed").map(str::to_string);

        Ok(Task {
            id,
            dir: dir.to_path_buf(),
            name,
            description,
            status,
            instructions: body,
            model,
            tags,
            created,
            started,
            completed,
        })
    }

    /// Transitions a task's status, stamping `started`/`completed` on the
    /// first entry into `running`/a terminal state respectively (§3).
    pub async fn transition(&self, dir: &Path, status: TaskStatus) -> Result<()> {
        let path = dir.join("task.md");
        let source = tokio::fs::read_to_string(&path).await?;
        let (mut fm, body) = frontmatter::parse(&source)?;

        fm.set("status", Value::String(status.as_str().to_string()));
        if status == TaskStatus::Running && fm.get("started").is_none() {
            fm.set("started", Value::String(Utc::now().to_rfc3339()));
        }
        if status.is_terminal() && fm.get("completed").is_none() {
            fm.set("completed", Value::String(Utc::now().to_rfc3339()));
        }

        let document = format!("{}\n{}", fm.render(), body);
        tokio::fs::write(path, document).await?;
        Ok(())
    }

    pub async fn write_result(&self, dir: &Path, content: &str) -> Result<()> {
        tokio::fs::write(dir.join("result.md"), content).await?;
        Ok(())
    }

    /// Appends one line to the free-form progress log, creating it if
    /// absent.
    pub async fn append_progress(&self, dir: &Path, line: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("progress.md"))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}
