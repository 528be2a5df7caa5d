/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use clap::Parser;
use distrobuild_core::init_state;
use distrobuild_core::types::Cli;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for SIGINT")?,
        _ = terminate.recv() => {}
    }

    Ok(())
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let _guard = cli
        .sentry_dsn
        .as_deref()
        .map(|dsn| sentry::init(dsn));

    let state = init_state(cli).await?;
    let shutdown = CancellationToken::new();

    let handles = reconciler::start_reconciler(Arc::clone(&state), shutdown.clone()).await?;

    shutdown_signal().await?;
    info!("Shutting down");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Reconciliation loop panicked");
        }
    }

    Ok(())
}
