// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! capd: capture agent daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;

use anyhow::Context;
use capd_adapters::{CachedCoordinator, HttpCoordinator};
use capd_core::TermSet;
use capd_daemon::{
    env, logging, serve_process, Config, Isolation, ProcessLauncher, Supervisor, TaskLauncher,
    WorkerLauncher, WorkerSpec,
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

#[derive(Parser)]
#[command(name = "capd", version, about = "Capture agent: runs the coordinator's active job")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor (default)
    Run {
        /// Config file [env: CAPD_CONFIG, default: ./capd.toml]
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a single capture worker, reporting on stdout
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        terms: String,
        #[arg(long, default_value_t = 0)]
        total: u64,
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run { config: None }) {
        Command::Run { config } => run(config.unwrap_or_else(env::config_path)).await,
        Command::Worker { name, terms, total, config } => {
            worker(WorkerSpec { name, terms: TermSet::parse(Some(&terms)), total }, config).await
        }
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let _log_guard = logging::init_supervisor(config.logging.dir.as_deref());
    info!(config = %config_path.display(), isolation = ?config.worker.isolation, "capd starting");

    let http = HttpCoordinator::new(&config.coordinator.base_url, config.coordinator.request_timeout())
        .context("creating coordinator client")?;
    let coordinator = CachedCoordinator::new(http, config.coordinator.cache_ttl());

    let launcher: Box<dyn WorkerLauncher> = match config.worker.isolation {
        Isolation::Process => {
            let exe = std::env::current_exe().context("locating capd executable")?;
            Box::new(ProcessLauncher::new(exe, &config_path))
        }
        Isolation::Task => Box::new(TaskLauncher::new(config.worker_settings())),
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    Supervisor::new(coordinator, launcher, config.supervisor_settings(), shutdown).run().await;
    Ok(())
}

async fn worker(spec: WorkerSpec, config_path: PathBuf) -> anyhow::Result<()> {
    logging::init_worker();
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Err(e) = serve_process(spec, config.worker_settings()).await {
        error!(error = %e, "worker failed");
        return Err(e.into());
    }
    Ok(())
}

/// Cancel on SIGINT or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
