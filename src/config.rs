//! Default paths for task and trace storage (ambient addition to SPEC_FULL).
//!
//! Grounded on the teacher's `src/config/paths.rs`: explicit env-var
//! override checked first, falling back to an XDG-style directory derived
//! from `dirs`, with a dotfile fallback if even that is unavailable.

use std::path::PathBuf;

/// The default tasks-root directory (§3, §6): where `t_NNN` directories
/// live absent an explicit override.
pub fn default_tasks_root() -> PathBuf {
    if let Ok(dir) = std::env::var("PICOAGENT_TASKS_ROOT") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("picoagent").join("tasks"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("picoagent").join("tasks"))
                .unwrap_or_else(|| PathBuf::from(".picoagent/tasks"))
        })
}

/// The default trace directory (§4.4.1, §6). `None` disables tracing
/// entirely unless the caller supplies one explicitly.
pub fn default_trace_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PICOAGENT_TRACE_DIR") {
        return Some(PathBuf::from(dir));
    }

    dirs::data_dir().map(|d| d.join("picoagent").join("traces"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the two tests
    // that set them so they don't interleave under the test harness.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn tasks_root_honors_explicit_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PICOAGENT_TASKS_ROOT", "/tmp/picoagent-test-tasks");
        assert_eq!(default_tasks_root(), PathBuf::from("/tmp/picoagent-test-tasks"));
        std::env::remove_var("PICOAGENT_TASKS_ROOT");
    }

    #[test]
    fn trace_dir_honors_explicit_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PICOAGENT_TRACE_DIR", "/tmp/picoagent-test-traces");
        assert_eq!(
            default_trace_dir(),
            Some(PathBuf::from("/tmp/picoagent-test-traces"))
        );
        std::env::remove_var("PICOAGENT_TRACE_DIR");
    }
}
