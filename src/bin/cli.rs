// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe Scene CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use polyframe_scene::cli::{RenderSummary, Reporter};
use polyframe_scene::pipeline::{Pipeline, ProgressEvent, Stage};
use polyframe_scene::{io, PipelineConfig, ScadParser};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Parser)]
#[command(name = "polyframe-scene")]
#[command(about = "Polyframe Scene - OpenSCAD source to renderable scene graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a SCAD file and print scene statistics
    Render {
        /// Input SCAD file
        input: String,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,

        /// Retry failed runs with exponential backoff
        #[arg(long)]
        retry: bool,

        /// Override the curved-surface resolution
        #[arg(long)]
        segments: Option<u32>,

        /// Skip boolean evaluation; booleans keep their first child
        #[arg(long)]
        no_csg: bool,
    },

    /// Parse SCAD file and output AST as JSON
    Parse {
        /// Input SCAD file
        input: String,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ok = match cli.command {
        Commands::Render {
            input,
            json,
            retry,
            segments,
            no_csg,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(segments) = segments {
                config.visitor.segments = segments;
            }
            if no_csg {
                config.visitor.enable_csg = false;
            }
            render_command(&input, config, json, retry, cli.verbose).await?
        }
        Commands::Parse { input, output } => parse_command(&input, output.as_deref(), cli.verbose)?,
        Commands::Config { output } => {
            let config = load_config(cli.config.as_deref())?;
            config_command(&config, output.as_deref())?
        }
        Commands::Version => {
            println!("Polyframe Scene v{}", env!("CARGO_PKG_VERSION"));
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        eprintln!("failed to initialize logging: {}", e);
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let mut config = PipelineConfig::from_file(path)?;
            config.apply_env();
            Ok(config)
        }
        None => PipelineConfig::load(),
    }
}

async fn render_command(
    input: &str,
    config: PipelineConfig,
    json: bool,
    retry: bool,
    verbose: bool,
) -> Result<bool> {
    if verbose {
        Reporter::report_info(&format!("Rendering {}", input));
    }
    let source = io::read_scad_file(input)?;
    let mut pipeline = Pipeline::new(ScadParser, config);

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(show_progress(rx, !json));

    let result = if retry {
        pipeline.process_with_retry(&source, Some(&tx)).await
    } else {
        pipeline.process_source(&source, Some(&tx))
    };
    drop(tx);
    progress.await?;
    pipeline.dispose();

    match result {
        Ok(output) => {
            if json {
                let summary = RenderSummary::new(input, &output);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                Reporter::report_render(input, &output);
            }
            Ok(true)
        }
        Err(e) => {
            Reporter::report_pipeline_error(input, &e);
            Ok(false)
        }
    }
}

/// Drive a progress bar from pipeline events until the sender is dropped
async fn show_progress(mut events: UnboundedReceiver<ProgressEvent>, visible: bool) {
    let bar = visible.then(|| {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    });

    while let Some(event) = events.recv().await {
        log::debug!(
            "{} {}% {} ({:.1}ms)",
            event.stage,
            event.progress,
            event.message,
            event.time_elapsed_ms
        );
        let Some(pb) = &bar else {
            continue;
        };
        match event.stage {
            Stage::Complete => {
                pb.set_position(100);
                pb.finish_with_message(event.message.green().to_string());
            }
            Stage::Failed => pb.set_message(event.message.red().to_string()),
            _ => {
                pb.set_position(u64::from(event.progress));
                pb.set_message(event.message);
            }
        }
    }

    if let Some(pb) = bar {
        if !pb.is_finished() {
            pb.abandon();
        }
    }
}

fn parse_command(input: &str, output: Option<&str>, verbose: bool) -> Result<bool> {
    if verbose {
        Reporter::report_info(&format!("Parsing {}", input));
    }

    let ast = io::import_scad_file(input)?;
    let json = serde_json::to_string_pretty(&ast)?;

    if let Some(output_path) = output {
        std::fs::write(output_path, json)?;
        if verbose {
            println!("{} {}", "AST written to:".green(), output_path);
        }
    } else {
        println!("{}", json);
    }

    Ok(true)
}

fn config_command(config: &PipelineConfig, output: Option<&Path>) -> Result<bool> {
    match output {
        Some(path) => {
            config.save(path)?;
            println!("{} {}", "Configuration written to:".green(), path.display());
        }
        None => println!("{}", toml::to_string_pretty(config)?),
    }
    Ok(true)
}
