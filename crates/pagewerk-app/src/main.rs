// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk command-line front end.
//
// Entry point. Initialises logging, loads the worker configuration, spawns
// the OCR worker and runs the requested subcommand against it.

mod args;
mod run;

use std::process::ExitCode;

use clap::Parser;
use pagewerk_core::config::WorkerConfig;
use pagewerk_worker::OcrWorker;

use args::{Cli, Commands};
use run::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "pagewerk failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    tracing::info!(thread = %config.thread_name, "Pagewerk starting");

    let worker = OcrWorker::with_ocrs(config)?;
    let init = run::init_options(&cli);

    let result = match cli.command {
        Commands::Recognize(args) => run::recognize(&worker, init, args).await,
        Commands::Pages(args) => run::pages(&worker, init, args).await,
    };

    if let Err(err) = worker.end().await {
        tracing::warn!(error = %err, "Engine shutdown reported an error");
    }
    result
}

fn load_config(cli: &Cli) -> CliResult<WorkerConfig> {
    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::from_env(),
    };
    if let Some(path) = &cli.data_path {
        config.data_path = Some(path.clone());
    }
    Ok(config)
}
