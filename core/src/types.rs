/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::input::{greater_than_zero, valid_tag_name};
use super::mbs::ModuleBuildService;
use super::sigul::SigningService;
use clap::Parser;
use entity::*;
use koji::BuildSystem;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "Distrobuild Scheduler", display_name = "Distrobuild Scheduler", bin_name = "distrobuild-scheduler", author = "Wavelens", version, about, long_about = None)]
pub struct Cli {
    #[arg(long, env = "DISTROBUILD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    #[arg(long, env = "DISTROBUILD_LOG_JSON", default_value = "false")]
    pub log_json: bool,
    #[arg(long, env = "DISTROBUILD_DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long, env = "DISTROBUILD_DATABASE_URL_FILE")]
    pub database_url_file: Option<String>,
    #[arg(long, env = "DISTROBUILD_KOJI_HUB_URL")]
    pub koji_hub_url: String,
    #[arg(long, env = "DISTROBUILD_KOJI_CERT_FILE")]
    pub koji_cert_file: Option<String>,
    #[arg(long, env = "DISTROBUILD_KOJI_KEY_FILE")]
    pub koji_key_file: Option<String>,
    #[arg(long, env = "DISTROBUILD_KOJI_PACKAGE_OWNER", default_value = "distrobuild")]
    pub koji_package_owner: String,
    #[arg(long, env = "DISTROBUILD_MBS_URL")]
    pub mbs_url: String,
    #[arg(long, env = "DISTROBUILD_COMPOSE_TAG", value_parser = valid_tag_name)]
    pub compose_tag: String,
    #[arg(long, env = "DISTROBUILD_DISABLE_SIGUL", default_value = "false")]
    pub disable_sigul: bool,
    #[arg(long, env = "DISTROBUILD_SIGUL_BINPATH", default_value = "sigul")]
    pub sigul_binpath: String,
    #[arg(long, env = "DISTROBUILD_SIGUL_CONFIG_FILE")]
    pub sigul_config_file: Option<String>,
    #[arg(long, env = "DISTROBUILD_SIGUL_KEY_NAME")]
    pub sigul_key_name: Option<String>,
    #[arg(long, env = "DISTROBUILD_SIGUL_KEY_ID")]
    pub sigul_key_id: Option<String>,
    #[arg(long, env = "DISTROBUILD_SIGUL_PASSPHRASE_FILE")]
    pub sigul_passphrase_file: Option<String>,
    #[arg(long, env = "DISTROBUILD_STATUS_INTERVAL", value_parser = greater_than_zero::<u64>, default_value = "300")]
    pub status_interval: u64,
    #[arg(long, env = "DISTROBUILD_SIGNING_INTERVAL", value_parser = greater_than_zero::<u64>, default_value = "300")]
    pub signing_interval: u64,
    #[arg(long, env = "DISTROBUILD_MAX_CONCURRENT_RECONCILIATIONS", value_parser = greater_than_zero::<usize>, default_value = "10")]
    pub max_concurrent_reconciliations: usize,
    #[arg(long, env = "DISTROBUILD_RPC_TIMEOUT", value_parser = greater_than_zero::<u64>, default_value = "60")]
    pub rpc_timeout: u64,
    #[arg(long, env = "DISTROBUILD_SIGN_TIMEOUT", value_parser = greater_than_zero::<u64>, default_value = "600")]
    pub sign_timeout: u64,
    #[arg(long, env = "DISTROBUILD_TAG_POLL_INTERVAL", value_parser = greater_than_zero::<u64>, default_value = "5")]
    pub tag_poll_interval: u64,
    #[arg(long, env = "DISTROBUILD_TAG_TIMEOUT", value_parser = greater_than_zero::<u64>, default_value = "600")]
    pub tag_timeout: u64,
    #[arg(long, env = "DISTROBUILD_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl Cli {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval)
    }

    pub fn signing_interval(&self) -> Duration {
        Duration::from_secs(self.signing_interval)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout)
    }

    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout)
    }

    pub fn tag_poll_interval(&self) -> Duration {
        Duration::from_secs(self.tag_poll_interval)
    }

    pub fn tag_timeout(&self) -> Duration {
        Duration::from_secs(self.tag_timeout)
    }
}

pub struct ServerState {
    pub db: DatabaseConnection,
    pub cli: Cli,
    pub koji: Arc<dyn BuildSystem>,
    pub mbs: Arc<dyn ModuleBuildService>,
    pub signer: Arc<dyn SigningService>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("db", &self.db)
            .field("cli", &self.cli)
            .finish_non_exhaustive()
    }
}

pub type EBuild = build::Entity;
pub type EPackage = package::Entity;

pub type MBuild = build::Model;
pub type MPackage = package::Model;

pub type ABuild = build::ActiveModel;
pub type APackage = package::ActiveModel;

pub type CBuild = build::Column;
pub type CPackage = package::Column;

pub type RBuild = build::Relation;
pub type RPackage = package::Relation;
