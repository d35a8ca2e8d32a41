//! MBL: a line-oriented DSL for scripting vision-model-driven remote-desktop automation.
//!
//! A task file is lexed, parsed into a [`ast::TaskDefinition`], statically validated, and then
//! run step by step by the [`engine::Engine`], which turns each action into a screenshot, a
//! vision-model call, and a handful of device calls against a [`collaborators::RemoteDesktopController`].

pub mod ast;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod logger;
pub mod parser;
pub mod prompt;
pub mod protocol;
pub mod validator;
pub mod vision_client;

pub use ast::TaskDefinition;
pub use config::Config;
pub use engine::{Engine, TaskExecutionResult};
pub use error::{EngineError, LexError, ParseError, ValidationError};

/// Lexes, parses, and validates an MBL source string into a ready-to-run [`TaskDefinition`].
pub fn load_task(source: &str, file_name: impl Into<String>) -> anyhow::Result<TaskDefinition> {
    let file_name = file_name.into();
    let tokens = lexer::lex(source).map_err(|err| anyhow::anyhow!("{}: {err}", file_name))?;
    let task = parser::parse(&tokens, file_name.clone()).map_err(|err| anyhow::anyhow!("{}: {err}", file_name))?;
    validator::validate(&task).map_err(|err| anyhow::anyhow!("{}: {err}", file_name))?;
    Ok(task)
}
