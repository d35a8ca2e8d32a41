//! Command-line argument surface for the `mbl-run` binary.
//!
//! A single `clap::Parser` struct plus a `-v`/`-vv` verbosity flag controlling the tracing filter,
//! so increasing verbosity never requires reaching for `RUST_LOG` by hand.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "mbl-run", about = "Run an MBL task file against a remote desktop")]
pub struct Cli {
    /// Path to the .mbl task file to run.
    pub task_file: PathBuf,

    /// Path to a YAML config file. Falls back to built-in defaults when absent.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Task input as `name=value`. Repeatable.
    #[arg(long = "input", value_parser = parse_input_pair)]
    pub inputs: Vec<(String, String)>,

    /// Directory the `FileTaskLogger` writes run directories under.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn params(&self) -> HashMap<String, String> {
        self.inputs.iter().cloned().collect()
    }
}

fn parse_input_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `name=value`, found `{s}`"))
}

pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("mbl_run={level},mbl_task_engine={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_file_and_inputs() {
        let cli = Cli::parse_from(["mbl-run", "task.mbl", "--input", "name=Ada", "--input", "amount=10"]);
        assert_eq!(cli.task_file, PathBuf::from("task.mbl"));
        assert_eq!(cli.params().get("name"), Some(&"Ada".to_string()));
        assert_eq!(cli.params().get("amount"), Some(&"10".to_string()));
    }

    #[test]
    fn malformed_input_pair_is_rejected() {
        let result = Cli::try_parse_from(["mbl-run", "task.mbl", "--input", "no-equals-sign"]);
        assert!(result.is_err());
    }
}
