//! Turns one `Action` into its screenshot/model/device call sequence.
//!
//! Each action kind is handled by an exhaustive match so that adding a new variant to `Action`
//! is a compile error here until it's dispatched.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ast::Action;
use crate::collaborators::ModelResponse;
use crate::error::EngineError;
use crate::protocol::{parse_boolean, parse_coordinate, parse_expect, parse_extract, CoordinateResult, ExpectResult, ExtractResult};
use crate::{prompt, protocol};

use super::context::ExecutionContext;
use super::EngineInner;

async fn sleep_cancellable(ms: u64, cancel: &CancellationToken) -> Result<(), EngineError> {
    if ms == 0 {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(()),
    }
}

/// Captures a screenshot, saves it via the logger, records its path in `ctx`, and returns the
/// raw bytes for a model call. Logger I/O is best-effort: a save failure is recorded as an empty
/// path rather than failing the action, since logging must never be why a task fails.
async fn capture(
    inner: &EngineInner,
    ctx: &mut ExecutionContext,
    prefix: &str,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, EngineError> {
    let bytes = inner.desktop.capture_screenshot(cancel).await?;
    let path = match inner.logger.save_screenshot(&bytes, prefix).await {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(error = %err, "failed to save screenshot; continuing without it");
            String::new()
        }
    };
    ctx.record_screenshot(path);
    Ok(bytes)
}

async fn call_model(
    inner: &EngineInner,
    ctx: &mut ExecutionContext,
    png_bytes: &[u8],
    prompt_text: &str,
    cancel: &CancellationToken,
) -> Result<ModelResponse, EngineError> {
    let resolution = &inner.config.resolution;
    let full_prompt = format!(
        "{}\n\n{}",
        prompt::system_prompt(resolution.width, resolution.height),
        prompt_text
    );
    let resp = inner.vision.send(png_bytes, &full_prompt, cancel).await?;
    ctx.record_tokens(resp.input_tokens, resp.output_tokens);
    Ok(resp)
}

/// Screenshots, asks the model to locate `target`, and parses the reply into a coordinate.
async fn locate(
    inner: &EngineInner,
    ctx: &mut ExecutionContext,
    target: &str,
    prefix: &str,
    cancel: &CancellationToken,
) -> Result<(i64, i64), EngineError> {
    let bytes = capture(inner, ctx, prefix, cancel).await?;
    let resp = call_model(inner, ctx, &bytes, &prompt::locate_prompt(target), cancel).await?;
    match parse_coordinate(&resp.text) {
        CoordinateResult::Found { x, y } => Ok((x, y)),
        CoordinateResult::NotFound { detail } => {
            Err(EngineError::ElementNotFound { target: target.to_string(), detail })
        }
    }
}

pub(super) async fn execute_actions(
    inner: &EngineInner,
    actions: &[Action],
    ctx: &mut ExecutionContext,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    for action in actions {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        tracing::debug!(kind = action.kind_name(), "executing action");
        execute_one(inner, action, ctx, cancel).await?;
    }
    Ok(())
}

fn execute_one<'a>(
    inner: &'a EngineInner,
    action: &'a Action,
    ctx: &'a mut ExecutionContext,
    cancel: &'a CancellationToken,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), EngineError>> + Send + 'a>> {
    Box::pin(async move {
        match action {
            Action::Expect { description } => {
                let intervals = &inner.config.expect_retry_intervals_ms;
                let attempts = 1 + intervals.len();
                let mut last_text = String::new();
                for attempt in 0..attempts {
                    let bytes = capture(inner, ctx, "expect", cancel).await?;
                    let resp = call_model(inner, ctx, &bytes, &prompt::expect_prompt(description), cancel).await?;
                    last_text = resp.text.clone();
                    match parse_expect(&resp.text) {
                        ExpectResult::Match => {
                            inner.logger.log_action("expect", description).await;
                            return Ok(());
                        }
                        ExpectResult::NoMatch | ExpectResult::Uncertain => {
                            if attempt < intervals.len() {
                                sleep_cancellable(intervals[attempt], cancel).await?;
                            }
                        }
                    }
                }
                Err(EngineError::ExpectExhausted { description: description.clone(), last_text })
            }

            Action::Click { target } => do_click(inner, ctx, target, cancel, ClickKind::Single).await,
            Action::DoubleClick { target } => do_click(inner, ctx, target, cancel, ClickKind::Double).await,
            Action::RightClick { target } => do_click(inner, ctx, target, cancel, ClickKind::Right).await,

            Action::Type { value, target, append } => {
                let resolved = ctx.resolve_value(value)?;
                let (x, y) = locate(inner, ctx, target, "type", cancel).await?;
                inner.desktop.click(x, y, cancel).await?;
                sleep_cancellable(inner.config.post_click_delay_ms, cancel).await?;
                if !append {
                    inner.desktop.send_key_combo("Ctrl+A", cancel).await?;
                    inner.desktop.send_key_combo("Delete", cancel).await?;
                }
                inner.desktop.send_keys(&resolved, cancel).await?;
                sleep_cancellable(inner.config.post_action_delay_ms, cancel).await?;
                inner.logger.log_action("type", target).await;
                Ok(())
            }

            Action::Select { value, target } => {
                let (dx, dy) = locate(inner, ctx, target, "select-dropdown", cancel).await?;
                inner.desktop.click(dx, dy, cancel).await?;
                sleep_cancellable(inner.config.post_click_delay_ms + 300, cancel).await?;

                let option_text = ctx.resolve_value(value)?;
                let (ox, oy) = locate(inner, ctx, &option_text, "select-option", cancel).await?;
                inner.desktop.click(ox, oy, cancel).await?;
                sleep_cancellable(inner.config.post_click_delay_ms, cancel).await?;
                inner.logger.log_action("select", target).await;
                Ok(())
            }

            Action::Key { key_combo } => {
                inner.desktop.send_key_combo(key_combo, cancel).await?;
                sleep_cancellable(inner.config.post_action_delay_ms, cancel).await?;
                inner.logger.log_action("key", key_combo).await;
                Ok(())
            }

            Action::Extract { variable_name, source } => {
                let bytes = capture(inner, ctx, "extract", cancel).await?;
                let resp = call_model(inner, ctx, &bytes, &prompt::extract_prompt(source), cancel).await?;
                match protocol::parse_extract(&resp.text) {
                    ExtractResult::Value(value) => {
                        ctx.record_extract(variable_name, value);
                        Ok(())
                    }
                    ExtractResult::Empty => {
                        ctx.record_extract(variable_name, String::new());
                        Ok(())
                    }
                    ExtractResult::NotFound => Err(EngineError::ElementNotFound {
                        target: source.clone(),
                        detail: "extract returned NOT_FOUND".to_string(),
                    }),
                }
            }

            Action::Output { variable_name } => {
                ctx.record_output(variable_name);
                Ok(())
            }

            Action::Screenshot => {
                capture(inner, ctx, "screenshot", cancel).await?;
                Ok(())
            }

            Action::Abort { message } => Err(EngineError::Abort(message.clone())),

            Action::IfScreenShows { condition, then_actions, else_actions } => {
                let bytes = capture(inner, ctx, "if", cancel).await?;
                let resp = call_model(inner, ctx, &bytes, &prompt::condition_prompt(condition), cancel).await?;
                if parse_boolean(&resp.text) {
                    execute_actions(inner, then_actions, ctx, cancel).await
                } else if let Some(else_actions) = else_actions {
                    execute_actions(inner, else_actions, ctx, cancel).await
                } else {
                    Ok(())
                }
            }
        }
    })
}

enum ClickKind {
    Single,
    Double,
    Right,
}

async fn do_click(
    inner: &EngineInner,
    ctx: &mut ExecutionContext,
    target: &str,
    cancel: &CancellationToken,
    kind: ClickKind,
) -> Result<(), EngineError> {
    let (x, y) = locate(inner, ctx, target, "click", cancel).await?;
    match kind {
        ClickKind::Single => inner.desktop.click(x, y, cancel).await?,
        ClickKind::Double => inner.desktop.double_click(x, y, cancel).await?,
        ClickKind::Right => inner.desktop.right_click(x, y, cancel).await?,
    }
    sleep_cancellable(inner.config.post_click_delay_ms, cancel).await?;
    inner.logger.log_action("click", target).await;
    Ok(())
}
