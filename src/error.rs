//! Layered error types for the lexer, parser, validator, and execution engine.
//!
//! Each layer gets its own `thiserror` enum rather than one grab-bag error, so a caller can
//! match on `LexError`/`ParseError` before execution ever starts and on `EngineError` once it
//! does.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid number: digit run immediately followed by identifier character")]
    MalformedNumber { line: usize },

    #[error("line {line}: empty key-combo segment")]
    EmptyKeyComboSegment { line: usize },

    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { line: usize, ch: char },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line }
            | LexError::MalformedNumber { line }
            | LexError::EmptyKeyComboSegment { line }
            | LexError::UnexpectedChar { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.line(), err.to_string())
    }
}

/// The ordered list of human-readable validation failures for a `TaskDefinition`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s): {}", self.messages.len(), self.messages.join("; "))
    }
}

/// Errors raised while a task is executing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("element not found for target {target:?}: {detail}")]
    ElementNotFound { target: String, detail: String },

    #[error("expect exhausted for {description:?}, last model response: {last_text:?}")]
    ExpectExhausted { description: String, last_text: String },

    #[error("step {step:?} timed out after {seconds}s")]
    StepTimedOut { step: String, seconds: u32 },

    #[error("{0}")]
    Abort(String),

    #[error("Task was cancelled.")]
    Cancelled,

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("model error: {0}")]
    ModelError(String),

    #[error("logger error: {0}")]
    LoggerError(String),
}

impl EngineError {
    /// Whether this failure should trigger the task's `on timeout` handler.
    pub fn triggers_on_timeout(&self) -> bool {
        matches!(self, EngineError::StepTimedOut { .. } | EngineError::ExpectExhausted { .. })
    }

    /// Whether this failure should trigger the task's `on error` handler.
    pub fn triggers_on_error(&self) -> bool {
        matches!(
            self,
            EngineError::ElementNotFound { .. }
                | EngineError::DeviceError(_)
                | EngineError::ModelError(_)
                | EngineError::LoggerError(_)
        )
    }
}
