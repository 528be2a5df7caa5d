/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use entity::build::BuildStatus;
use entity::package;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectOptions, ConnectionTrait,
    Database, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::consts::{DB_MAX_CONNECTIONS, DB_MIN_CONNECTIONS, DB_TIMEOUT_SECS};
use super::input::read_secret_file;
use super::types::*;

/// Every reconciliation unit holds a connection for its whole transaction,
/// so the pool must fit all units of both loops plus the candidate queries.
pub fn pool_size(cli: &Cli) -> u32 {
    let loops = if cli.disable_sigul { 1 } else { 2 };
    let needed = cli
        .max_concurrent_reconciliations
        .saturating_mul(loops)
        .saturating_add(DB_MIN_CONNECTIONS as usize);

    u32::try_from(needed)
        .unwrap_or(u32::MAX)
        .max(DB_MAX_CONNECTIONS)
}

pub async fn connect_db(cli: &Cli) -> Result<DatabaseConnection> {
    let db_url = if let Some(file) = &cli.database_url_file {
        read_secret_file(file).context("Failed to read database url from file")?
    } else if let Some(url) = &cli.database_url {
        url.clone()
    } else {
        anyhow::bail!("No database url provided")
    };

    let mut opt = ConnectOptions::new(db_url);

    // Only log SQL statements at debug level
    opt.sqlx_logging(cli.log_level == "debug");

    opt.max_connections(pool_size(cli))
        .min_connections(DB_MIN_CONNECTIONS)
        .connect_timeout(Duration::from_secs(DB_TIMEOUT_SECS))
        .acquire_timeout(Duration::from_secs(DB_TIMEOUT_SECS));

    Database::connect(opt)
        .await
        .context("Failed to connect to database")
}

/// Selects builds by status and signing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFilter {
    pub status: Option<BuildStatus>,
    pub signed: Option<bool>,
    /// Only builds submitted to koji.
    pub koji_only: bool,
}

impl BuildFilter {
    pub fn building() -> Self {
        BuildFilter {
            status: Some(BuildStatus::Building),
            ..Default::default()
        }
    }

    pub fn unsigned() -> Self {
        BuildFilter {
            status: Some(BuildStatus::Succeeded),
            signed: Some(false),
            koji_only: true,
        }
    }

    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(status) = self.status {
            condition = condition.add(CBuild::Status.eq(status));
        }

        if let Some(signed) = self.signed {
            condition = condition.add(CBuild::Signed.eq(signed));
        }

        if self.koji_only {
            condition = condition.add(CBuild::KojiId.is_not_null());
        }

        condition
    }
}

pub async fn find_builds<C: ConnectionTrait>(
    db: &C,
    filter: &BuildFilter,
) -> Result<Vec<MBuild>, DbErr> {
    EBuild::find()
        .filter(filter.condition())
        .order_by_asc(CBuild::CreatedAt)
        .all(db)
        .await
}

/// Like [`find_builds`], joined with the owning package. Builds whose package
/// row is missing are skipped.
pub async fn find_builds_with_package<C: ConnectionTrait>(
    db: &C,
    filter: &BuildFilter,
) -> Result<Vec<(MBuild, MPackage)>, DbErr> {
    let rows = EBuild::find()
        .filter(filter.condition())
        .order_by_asc(CBuild::CreatedAt)
        .find_also_related(package::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(build, package)| match package {
            Some(package) => Some((build, package)),
            None => {
                warn!(build_id = %build.id, package_id = %build.package, "Build references missing package");
                None
            }
        })
        .collect())
}

/// Re-reads a build under an exclusive row lock. Returns `None` if the row no
/// longer matches `filter`, which means another run already handled it.
pub async fn lock_build<C: ConnectionTrait>(
    db: &C,
    build_id: Uuid,
    filter: &BuildFilter,
) -> Result<Option<MBuild>, DbErr> {
    EBuild::find_by_id(build_id)
        .filter(filter.condition())
        .lock_exclusive()
        .one(db)
        .await
}

pub async fn find_package<C: ConnectionTrait>(db: &C, package_id: Uuid) -> Result<MPackage> {
    EPackage::find_by_id(package_id)
        .lock_exclusive()
        .one(db)
        .await
        .context("Failed to query package")?
        .with_context(|| format!("Package {} not found", package_id))
}

/// Persists the fields this service owns on a build: status and signing state.
pub async fn save_build<C: ConnectionTrait>(db: &C, build: MBuild) -> Result<MBuild> {
    build.validate()?;

    let status = build.status;
    let signed = build.signed;
    let mut abuild: ABuild = build.into_active_model();

    abuild.status = Set(status);
    abuild.signed = Set(signed);
    abuild.updated_at = Set(Utc::now().naive_utc());

    abuild.update(db).await.context("Failed to update build")
}

pub async fn save_package<C: ConnectionTrait>(db: &C, package: MPackage) -> Result<MPackage> {
    let last_build = package.last_build;
    let mut apackage: APackage = package.into_active_model();

    apackage.last_build = Set(last_build);

    apackage.update(db).await.context("Failed to update package")
}

pub async fn update_build_status<C: ConnectionTrait>(
    db: &C,
    mut build: MBuild,
    status: BuildStatus,
) -> Result<MBuild> {
    if build.status.is_terminal() && build.status != status {
        anyhow::bail!(
            "Build {} is already {:?} and cannot become {:?}",
            build.id,
            build.status,
            status
        );
    }

    debug!(build_id = %build.id, status = ?status, "Updating build status");

    build.status = status;
    save_build(db, build).await
}

pub async fn mark_build_signed<C: ConnectionTrait>(db: &C, mut build: MBuild) -> Result<MBuild> {
    debug!(build_id = %build.id, "Marking build as signed");

    build.signed = true;
    save_build(db, build).await
}

/// Records a successful build on the owning package.
pub async fn record_package_build<C: ConnectionTrait>(
    db: &C,
    package_id: Uuid,
    at: NaiveDateTime,
) -> Result<MPackage> {
    let mut package = find_package(db, package_id).await?;

    debug!(package_id = %package.id, package = %package.name, "Updating last build time");

    package.last_build = Some(at);
    save_package(db, package).await
}
