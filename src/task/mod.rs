//! Task record persistence (§3 "Task record", §6 "Task directory on disk").
//!
//! Grounded on the teacher's `src/database/tasks.rs` (a pending→processing→
//! terminal task lifecycle) and `src/tools/task.rs` (the create/list/update
//! tool surface over it), translated from a Postgres-backed store into a
//! filesystem/frontmatter-backed one: a directory `t_NNN` per task, holding
//! `task.md`/`progress.md`/`result.md` instead of rows in a table.

pub mod frontmatter;
mod store;

pub use store::{Task, TaskStatus, TaskStore};
