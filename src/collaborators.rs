//! Collaborator contracts the engine consumes, plus the minimal/mock implementations used by
//! tests and, for the desktop controller, by the CLI until a real transport is wired up.
//!
//! Each boundary is a trait object so the engine never depends on a concrete transport: swapping
//! the remote-desktop backend, the vision-model provider, or the logging sink never touches the
//! step loop or action dispatch.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// One vision-model reply, including the accounting the engine needs.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub model: String,
    pub duration_ms: u64,
}

/// Controls a remote-desktop session: screenshots in, mouse/keyboard events out.
#[async_trait]
pub trait RemoteDesktopController: Send + Sync {
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn is_connected(&self) -> bool;
    async fn capture_screenshot(&self, cancel: &CancellationToken) -> Result<Vec<u8>, EngineError>;
    async fn click(&self, x: i64, y: i64, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn double_click(&self, x: i64, y: i64, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn right_click(&self, x: i64, y: i64, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn send_keys(&self, text: &str, cancel: &CancellationToken) -> Result<(), EngineError>;
    async fn send_key_combo(&self, combo: &str, cancel: &CancellationToken) -> Result<(), EngineError>;
}

/// Sends a screenshot + prompt to a vision-language model and returns its reply.
#[async_trait]
pub trait VisionModelClient: Send + Sync {
    async fn send(
        &self,
        png_bytes: &[u8],
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, EngineError>;
}

/// Records a task run's progress. Every call is best-effort from the engine's point of view.
#[async_trait]
pub trait TaskLogger: Send + Sync {
    async fn start_task_log(&self, task_name: &str) -> Result<String, EngineError>;
    async fn log_task_start(&self, params: &std::collections::HashMap<String, String>);
    async fn log_step_start(&self, step_name: &str);
    async fn log_step_complete(&self, step_name: &str);
    async fn log_action(&self, action_kind: &str, detail: &str);
    async fn log_task_complete(&self, success: bool, error: Option<&str>);
    async fn save_screenshot(&self, png_bytes: &[u8], prefix: &str) -> Result<String, EngineError>;
    async fn flush(&self);
}

/// Production placeholder: documents the missing real remote-desktop transport by erroring on
/// every call, rather than silently pretending to succeed.
#[derive(Debug, Default)]
pub struct NullDesktopController;

#[async_trait]
impl RemoteDesktopController for NullDesktopController {
    async fn connect(&self, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn disconnect(&self, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Ok(())
    }
    async fn is_connected(&self) -> bool {
        false
    }
    async fn capture_screenshot(&self, _cancel: &CancellationToken) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn click(&self, _x: i64, _y: i64, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn double_click(&self, _x: i64, _y: i64, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn right_click(&self, _x: i64, _y: i64, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn send_keys(&self, _text: &str, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
    async fn send_key_combo(&self, _combo: &str, _cancel: &CancellationToken) -> Result<(), EngineError> {
        Err(EngineError::DeviceError("no remote-desktop transport configured".to_string()))
    }
}

/// Discards everything. Used by tests that exercise the engine without caring about logs.
#[derive(Debug, Default)]
pub struct NullTaskLogger;

#[async_trait]
impl TaskLogger for NullTaskLogger {
    async fn start_task_log(&self, _task_name: &str) -> Result<String, EngineError> {
        Ok(String::new())
    }
    async fn log_task_start(&self, _params: &std::collections::HashMap<String, String>) {}
    async fn log_step_start(&self, _step_name: &str) {}
    async fn log_step_complete(&self, _step_name: &str) {}
    async fn log_action(&self, _action_kind: &str, _detail: &str) {}
    async fn log_task_complete(&self, _success: bool, _error: Option<&str>) {}
    async fn save_screenshot(&self, _png_bytes: &[u8], _prefix: &str) -> Result<String, EngineError> {
        Ok(String::new())
    }
    async fn flush(&self) {}
}
