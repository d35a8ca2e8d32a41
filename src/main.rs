//! `mbl-run`: loads an MBL task file, validates it, and executes it against a remote desktop.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use mbl_task_engine::collaborators::NullDesktopController;
use mbl_task_engine::vision_client::ReqwestVisionClient;
use mbl_task_engine::{logger::FileTaskLogger, Config, Engine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    cli::init_tracing(cli.verbose);

    let source = std::fs::read_to_string(&cli.task_file)
        .map_err(|err| anyhow::anyhow!("reading {}: {err}", cli.task_file.display()))?;
    let task = mbl_task_engine::load_task(&source, cli.task_file.display().to_string())?;

    let config = match &cli.config {
        Some(path) => Config::load_yaml_config(path)?,
        None => Config::default(),
    };

    let vision = Arc::new(ReqwestVisionClient::new(&config.vision));
    let desktop = Arc::new(NullDesktopController);
    let logger = Arc::new(FileTaskLogger::new(cli.log_dir.clone()));

    let engine = Engine::new(config, desktop, vision, logger);
    let result = engine.execute(&task, cli.params(), CancellationToken::new()).await;

    println!("task: {}", task.name);
    println!("success: {}", result.success);
    println!("steps: {}/{}", result.steps_completed, result.steps_total);
    println!("duration_ms: {}", result.duration_ms);
    if let Some(step) = &result.failed_at_step {
        println!("failed_at_step: {step}");
    }
    if let Some(error) = &result.error {
        println!("error: {error}");
    }
    for (name, value) in &result.outputs {
        println!("output {name}: {value}");
    }

    if result.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
