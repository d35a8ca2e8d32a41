//! The execution engine: a sequential step/action interpreter.
//!
//! Split into a cheaply-clonable `Engine` handle around shared, `Arc`-held state and an
//! `ExecutionContext` owned exclusively by the in-flight `execute()` call. This keeps
//! `is_running`/`current_step_name` readable from outside the call that's running a task,
//! without needing a command-channel actor — calls into a single engine are already serialised
//! by the caller, so a plain `Arc<Mutex<EngineStatus>>` is enough.

mod context;
mod dispatch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

pub use context::ExecutionContext;

use crate::ast::{ErrorHandler, TaskDefinition};
use crate::collaborators::{RemoteDesktopController, TaskLogger, VisionModelClient};
use crate::config::Config;
use crate::error::EngineError;

/// Snapshot-readable engine state, written only from the execution path.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    pub is_running: bool,
    pub current_task_name: Option<String>,
    pub current_step_name: Option<String>,
}

/// The result of one `execute()` call.
#[derive(Debug, Clone)]
pub struct TaskExecutionResult {
    pub success: bool,
    pub error: Option<String>,
    pub failed_at_step: Option<String>,
    pub outputs: HashMap<String, String>,
    pub steps_completed: usize,
    pub steps_total: usize,
    pub duration_ms: u64,
    pub log_file: String,
    pub screenshot_path: Option<String>,
}

pub(crate) struct EngineInner {
    config: Config,
    desktop: Arc<dyn RemoteDesktopController>,
    vision: Arc<dyn VisionModelClient>,
    logger: Arc<dyn TaskLogger>,
    status: Mutex<EngineStatus>,
}

/// A cheaply-clonable handle to the engine. Runs at most one task at a time; a second concurrent
/// `execute()` call observes `is_running` and is rejected rather than queued.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(
        config: Config,
        desktop: Arc<dyn RemoteDesktopController>,
        vision: Arc<dyn VisionModelClient>,
        logger: Arc<dyn TaskLogger>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner { config, desktop, vision, logger, status: Mutex::new(EngineStatus::default()) }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.status.lock().unwrap().is_running
    }

    pub fn current_task_name(&self) -> Option<String> {
        self.inner.status.lock().unwrap().current_task_name.clone()
    }

    pub fn current_step_name(&self) -> Option<String> {
        self.inner.status.lock().unwrap().current_step_name.clone()
    }

    /// Runs `task` to completion (or failure, abort, timeout, or cancellation). See spec
    /// §4.6.1–§4.6.4 for the full contract.
    pub async fn execute(
        &self,
        task: &TaskDefinition,
        params: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> TaskExecutionResult {
        {
            let mut status = self.inner.status.lock().unwrap();
            if status.is_running {
                return TaskExecutionResult {
                    success: false,
                    error: Some("engine is already executing a task".to_string()),
                    failed_at_step: None,
                    outputs: HashMap::new(),
                    steps_completed: 0,
                    steps_total: task.steps.len(),
                    duration_ms: 0,
                    log_file: String::new(),
                    screenshot_path: None,
                };
            }
            status.is_running = true;
            status.current_task_name = Some(task.name.clone());
        }

        let result = self.run_task(task, params, cancel).await;

        {
            let mut status = self.inner.status.lock().unwrap();
            status.is_running = false;
            status.current_task_name = None;
            status.current_step_name = None;
        }

        result
    }

    async fn run_task(
        &self,
        task: &TaskDefinition,
        params: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> TaskExecutionResult {
        let started = Instant::now();
        let log_file = self.inner.logger.start_task_log(&task.name).await.unwrap_or_default();

        let normalized: HashMap<String, String> =
            params.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();

        for input_name in &task.inputs {
            if !normalized.contains_key(&input_name.to_lowercase()) {
                let err = EngineError::MissingInput(input_name.clone());
                self.inner.logger.log_task_complete(false, Some(&err.to_string())).await;
                self.inner.logger.flush().await;
                return TaskExecutionResult {
                    success: false,
                    error: Some(err.to_string()),
                    failed_at_step: None,
                    outputs: HashMap::new(),
                    steps_completed: 0,
                    steps_total: task.steps.len(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    log_file,
                    screenshot_path: None,
                };
            }
        }

        self.inner.logger.log_task_start(&normalized).await;
        tracing::info!(task = %task.name, "task_start");

        let mut ctx = ExecutionContext::new(task.name.clone(), normalized);
        let mut steps_completed = 0usize;
        let mut failure: Option<(EngineError, String)> = None;

        for step in &task.steps {
            if cancel.is_cancelled() {
                failure = Some((EngineError::Cancelled, step.description.clone()));
                break;
            }

            ctx.current_step_index = steps_completed;
            ctx.current_step_name = step.description.clone();
            self.inner.status.lock().unwrap().current_step_name = Some(step.description.clone());
            self.inner.logger.log_step_start(&step.description).await;
            tracing::debug!(step = %step.description, "step_start");

            let step_timeout_secs =
                step.timeout_seconds.unwrap_or(self.inner.config.default_expect_timeout_seconds);
            let linked = cancel.child_token();
            let deadline = {
                let linked = linked.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_secs(u64::from(step_timeout_secs))).await;
                    linked.cancel();
                })
            };

            let step_result = dispatch::execute_actions(&self.inner, &step.actions, &mut ctx, &linked).await;
            deadline.abort();

            match step_result {
                Ok(()) => {
                    self.inner.logger.log_step_complete(&step.description).await;
                    tracing::debug!(step = %step.description, "step_complete");
                    steps_completed += 1;
                }
                Err(raw_err) => {
                    let classified = match raw_err {
                        EngineError::Cancelled if !cancel.is_cancelled() => {
                            EngineError::StepTimedOut { step: step.description.clone(), seconds: step_timeout_secs }
                        }
                        other => other,
                    };

                    let handler_override = if classified.triggers_on_timeout() {
                        self.run_handler(task.on_timeout.as_ref(), &mut ctx, &cancel).await
                    } else if classified.triggers_on_error() {
                        self.run_handler(task.on_error.as_ref(), &mut ctx, &cancel).await
                    } else {
                        None
                    };

                    let final_err = handler_override.unwrap_or(classified);
                    tracing::error!(step = %step.description, error = %final_err, "step_failed");
                    failure = Some((final_err, step.description.clone()));
                    break;
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let outputs = ctx.outputs();
        let screenshot_path = ctx.last_screenshot();

        let (success, error, failed_at_step) = match failure {
            None => (true, None, None),
            Some((err, step_name)) => (false, Some(err.to_string()), Some(step_name)),
        };

        self.inner.logger.log_task_complete(success, error.as_deref()).await;
        self.inner.logger.flush().await;
        tracing::info!(task = %task.name, success, "task_complete");

        TaskExecutionResult {
            success,
            error,
            failed_at_step,
            outputs,
            steps_completed,
            steps_total: task.steps.len(),
            duration_ms,
            log_file,
            screenshot_path,
        }
    }

    /// Runs a handler's actions under the outer cancel token. Most handler-body failures are
    /// logged and discarded — a handler is a best-effort cleanup/notification step, not a second
    /// chance at the task. An explicit `abort` inside the handler is the one case that overrides
    /// the original failure, since it is the task author's deliberate final word on what happened.
    async fn run_handler(
        &self,
        handler: Option<&ErrorHandler>,
        ctx: &mut ExecutionContext,
        cancel: &CancellationToken,
    ) -> Option<EngineError> {
        let handler = handler?;
        match dispatch::execute_actions(&self.inner, &handler.actions, ctx, cancel).await {
            Ok(()) => None,
            Err(EngineError::Abort(msg)) => Some(EngineError::Abort(msg)),
            Err(other) => {
                tracing::warn!(error = %other, "handler action failed; discarding");
                None
            }
        }
    }
}
