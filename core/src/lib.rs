/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod consts;
pub mod database;
pub mod input;
pub mod mbs;
pub mod sigul;
pub mod types;

use anyhow::{Context, Result};
use database::connect_db;
use input::read_secret_file;
use koji::{BuildSystem, KojiSession};
use mbs::{MbsClient, ModuleBuildService};
use sigul::{SigningService, SigulClient};
use std::sync::Arc;
use tracing::info;
use types::*;

pub async fn init_state(cli: Cli) -> Result<Arc<ServerState>> {
    info!(koji = %cli.koji_hub_url, mbs = %cli.mbs_url, compose_tag = %cli.compose_tag, "Starting Distrobuild Scheduler");

    let db = connect_db(&cli).await?;

    let koji: Arc<dyn BuildSystem> = Arc::new(connect_koji(&cli)?);
    let mbs: Arc<dyn ModuleBuildService> =
        Arc::new(MbsClient::new(cli.mbs_url.clone(), cli.rpc_timeout())?);
    let signer: Arc<dyn SigningService> = Arc::new(sigul_client(&cli)?);

    Ok(Arc::new(ServerState {
        db,
        cli,
        koji,
        mbs,
        signer,
    }))
}

fn connect_koji(cli: &Cli) -> Result<KojiSession> {
    match (&cli.koji_cert_file, &cli.koji_key_file) {
        (Some(cert_file), Some(key_file)) => {
            let cert = std::fs::read(cert_file)
                .with_context(|| format!("Failed to read koji certificate {}", cert_file))?;
            let key = std::fs::read(key_file)
                .with_context(|| format!("Failed to read koji key {}", key_file))?;

            KojiSession::with_client_certificate(
                cli.koji_hub_url.clone(),
                &cert,
                &key,
                cli.rpc_timeout(),
            )
            .context("Failed to create koji session")
        }
        (None, None) => KojiSession::new(cli.koji_hub_url.clone(), cli.rpc_timeout())
            .context("Failed to create koji session"),
        _ => anyhow::bail!("Koji certificate and key must be configured together"),
    }
}

fn sigul_client(cli: &Cli) -> Result<SigulClient> {
    let passphrase = match &cli.sigul_passphrase_file {
        Some(file) => read_secret_file(file).context("Failed to read sigul passphrase")?,
        None => String::new(),
    };

    if !cli.disable_sigul {
        if cli.sigul_key_name.is_none() || cli.sigul_key_id.is_none() {
            anyhow::bail!("Signing requires --sigul-key-name and --sigul-key-id");
        }

        if cli.koji_cert_file.is_none() {
            anyhow::bail!("Signing requires an authenticated koji session");
        }
    }

    Ok(SigulClient {
        binpath: cli.sigul_binpath.clone(),
        config_file: cli.sigul_config_file.clone(),
        key_name: cli.sigul_key_name.clone().unwrap_or_default(),
        passphrase,
        timeout: cli.sign_timeout(),
    })
}
