use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;

use cli::commands::{Commands, InputArgs};
use cli::prompt::PromptApprover;
use cli::render::{render_candidates, render_highlight, render_refinement};
use cli::Cli;
use flow_refine::FlowError;
use flow_refine::config::{Config, load_config};
use flow_refine::inference::Models;
use flow_refine::pipeline::{CancelFlag, RefineMode, RefinementPipeline};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flow")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("flow.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Cancel in-flight refinement on Ctrl-C.
fn cancel_on_interrupt() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            flag.cancel();
        }
    });
    cancel
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{} {}", "Inference server:".yellow(), config.models.endpoint);
    }

    let models = Models::connect(&config.models, config.refine.use_nli_check)
        .await
        .context("Failed to connect to inference server")?;
    let pipeline = RefinementPipeline::new(models, config.refine.clone())?
        .with_concurrency(config.concurrency.max_sentences);

    match &cli.command {
        Commands::Candidates { input, top, json } => handle_candidates(&pipeline, input, *top, *json).await,
        Commands::Highlight {
            input,
            suggestions,
            json,
        } => {
            let top_n = suggestions.unwrap_or(config.highlight.top_suggestions);
            handle_highlight(&pipeline, input, top_n, *json).await
        }
        Commands::Refine {
            input,
            interactive,
            output,
            json,
        } => handle_refine(&pipeline, input, *interactive, output.as_deref(), *json).await,
    }
}

async fn handle_candidates(pipeline: &RefinementPipeline, input: &InputArgs, top_n: usize, json: bool) -> Result<()> {
    let text = input.read()?;
    info!("Listing top {} candidate(s) for {} byte(s)", top_n, text.len());

    let report = pipeline.candidates_text(&text, top_n).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_candidates(&report, pipeline.config()));
    }
    Ok(())
}

async fn handle_highlight(pipeline: &RefinementPipeline, input: &InputArgs, top_n: usize, json: bool) -> Result<()> {
    let text = input.read()?;
    info!("Highlighting {} byte(s), top {} suggestion(s)", text.len(), top_n);

    let report = pipeline.highlight_text(&text, top_n).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_highlight(&report));
    }
    Ok(())
}

async fn handle_refine(
    pipeline: &RefinementPipeline,
    input: &InputArgs,
    interactive: bool,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    if interactive && input.text.is_none() && input.file.is_none() {
        eyre::bail!("Interactive mode needs the text as an argument or --file; stdin is used for answers");
    }
    let text = input.read()?;
    info!("Refining {} byte(s), interactive: {}", text.len(), interactive);

    let cancel = cancel_on_interrupt();
    let mut approver = PromptApprover::stdio();
    let mode = if interactive {
        RefineMode::Interactive(&mut approver)
    } else {
        RefineMode::Automatic
    };

    let refinement = match pipeline.refine_text(&text, mode, &cancel).await {
        Ok(refinement) => refinement,
        Err(FlowError::Cancelled { edits_applied }) => {
            println!("{} after {} edit(s); text left unchanged", "Cancelled".yellow(), edits_applied);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = output {
        fs::write(path, &refinement.refined).context(format!("Failed to write {}", path.display()))?;
        info!("Wrote refined text to {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&refinement)?);
    } else {
        print!("{}", render_refinement(&refinement));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then apply command-line overrides
    let mut config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.thresholds.apply(&mut config.refine);
    config.validate().context("Invalid threshold override")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
