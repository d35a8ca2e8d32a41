//! The ambient default [`crate::collaborators::TaskLogger`]: a directory-per-run, newline-
//! delimited JSON trajectory writer, re-derived from the line-oriented trajectory recorder
//! pattern used elsewhere in the pack rather than copied from any single file.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::collaborators::TaskLogger;
use crate::error::EngineError;

#[derive(Debug, Serialize)]
#[serde(tag = "event")]
enum TrajectoryEvent<'a> {
    TaskStart { timestamp: String, params: &'a HashMap<String, String> },
    StepStart { timestamp: String, step: &'a str },
    StepComplete { timestamp: String, step: &'a str },
    Action { timestamp: String, kind: &'a str, detail: &'a str },
    TaskComplete { timestamp: String, success: bool, error: Option<&'a str> },
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Writes one directory per task run under `base_dir`, each holding `trajectory.jsonl` plus any
/// saved screenshots.
pub struct FileTaskLogger {
    base_dir: PathBuf,
    run_dir: Mutex<Option<PathBuf>>,
    screenshot_count: AtomicU32,
}

impl FileTaskLogger {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), run_dir: Mutex::new(None), screenshot_count: AtomicU32::new(0) }
    }

    fn run_dir(&self) -> PathBuf {
        self.run_dir.lock().unwrap().clone().unwrap_or_else(|| self.base_dir.clone())
    }

    fn append_event(&self, event: &TrajectoryEvent) {
        let path = self.run_dir().join("trajectory.jsonl");
        let Ok(line) = serde_json::to_string(event) else { return };
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{line}");
        }
    }
}

#[async_trait]
impl TaskLogger for FileTaskLogger {
    async fn start_task_log(&self, task_name: &str) -> Result<String, EngineError> {
        let sanitized: String = task_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let dir = self.base_dir.join(format!("{sanitized}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir)
            .map_err(|err| EngineError::LoggerError(format!("creating {}: {err}", dir.display())))?;
        *self.run_dir.lock().unwrap() = Some(dir.clone());
        Ok(dir.display().to_string())
    }

    async fn log_task_start(&self, params: &HashMap<String, String>) {
        self.append_event(&TrajectoryEvent::TaskStart { timestamp: now(), params });
    }

    async fn log_step_start(&self, step_name: &str) {
        self.append_event(&TrajectoryEvent::StepStart { timestamp: now(), step: step_name });
    }

    async fn log_step_complete(&self, step_name: &str) {
        self.append_event(&TrajectoryEvent::StepComplete { timestamp: now(), step: step_name });
    }

    async fn log_action(&self, action_kind: &str, detail: &str) {
        self.append_event(&TrajectoryEvent::Action { timestamp: now(), kind: action_kind, detail });
    }

    async fn log_task_complete(&self, success: bool, error: Option<&str>) {
        self.append_event(&TrajectoryEvent::TaskComplete { timestamp: now(), success, error });
    }

    async fn save_screenshot(&self, png_bytes: &[u8], prefix: &str) -> Result<String, EngineError> {
        let n = self.screenshot_count.fetch_add(1, Ordering::SeqCst);
        let path = self.run_dir().join(format!("{prefix}-{n}.png"));
        std::fs::write(&path, png_bytes)
            .map_err(|err| EngineError::LoggerError(format!("writing {}: {err}", path.display())))?;
        Ok(path.display().to_string())
    }

    async fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_task_log_creates_a_fresh_directory_per_call() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = FileTaskLogger::new(tmp.path());

        let first = logger.start_task_log("demo task").await.unwrap();
        let second = logger.start_task_log("demo task").await.unwrap();

        assert_ne!(first, second);
        assert!(std::path::Path::new(&first).is_dir());
        assert!(std::path::Path::new(&second).is_dir());
    }

    #[tokio::test]
    async fn save_screenshot_lives_under_the_run_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = FileTaskLogger::new(tmp.path());
        let run_dir = logger.start_task_log("demo").await.unwrap();

        let saved = logger.save_screenshot(b"png-bytes", "step0").await.unwrap();
        assert!(saved.starts_with(&run_dir));
        assert_eq!(std::fs::read(&saved).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn trajectory_file_records_events_as_jsonl() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = FileTaskLogger::new(tmp.path());
        let run_dir = logger.start_task_log("demo").await.unwrap();

        logger.log_step_start("s1").await;
        logger.log_action("click", "Save").await;
        logger.log_task_complete(true, None).await;

        let contents = std::fs::read_to_string(PathBuf::from(run_dir).join("trajectory.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("StepStart"));
        assert!(lines[1].contains("click"));
        assert!(lines[2].contains("TaskComplete"));
    }
}
