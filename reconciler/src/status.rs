/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use chrono::Utc;
use distrobuild_core::database::*;
use distrobuild_core::mbs::{ModuleBuildService, ModuleBuildState};
use distrobuild_core::types::*;
use entity::build::{BuildBackend, BuildStatus};
use koji::{BuildSystem, ErrorKind, TaskState};
use sea_orm::TransactionTrait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The backend has not reached a terminal state yet.
    Unchanged,
    /// The build left `Building` before the row lock was taken.
    AlreadyReconciled,
    Updated(BuildStatus),
}

impl StatusOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, StatusOutcome::Updated(_))
    }
}

/// Maps a koji build task to a terminal build status, if it has one.
pub async fn koji_task_status(koji: &dyn BuildSystem, task_id: i32) -> Result<Option<BuildStatus>> {
    let task_info = koji
        .get_task_info(task_id)
        .await
        .with_context(|| format!("Failed to get info for koji task {}", task_id))?;

    debug!(task_id, state = ?task_info.state, "Fetched koji task info");

    match task_info.state {
        TaskState::Closed => Ok(Some(BuildStatus::Succeeded)),
        TaskState::Canceled => Ok(Some(BuildStatus::Cancelled)),
        TaskState::Failed => failed_task_status(koji, task_id).await.map(Some),
        TaskState::Free | TaskState::Open | TaskState::Assigned => Ok(None),
    }
}

async fn failed_task_status(koji: &dyn BuildSystem, task_id: i32) -> Result<BuildStatus> {
    let error = match koji.get_task_result(task_id).await {
        Ok(result) => {
            debug!(task_id, result = ?result, "Failed task returned a result");
            return Ok(BuildStatus::Failed);
        }
        Err(e) => e,
    };

    match error.kind() {
        ErrorKind::BuildError | ErrorKind::RpcFault => {
            debug!(task_id, error = %error, "Task failed to build");
            Ok(BuildStatus::Failed)
        }
        ErrorKind::GenericError => {
            debug!(task_id, error = %error, "Task was aborted");
            Ok(BuildStatus::Cancelled)
        }
        ErrorKind::Connection => Err(error)
            .with_context(|| format!("Failed to get result of koji task {}", task_id)),
    }
}

pub async fn mbs_build_status(
    mbs: &dyn ModuleBuildService,
    build_id: i32,
) -> Result<Option<BuildStatus>> {
    let module_build = mbs.get_build(build_id).await?;

    match module_build.state() {
        ModuleBuildState::Ready => Ok(Some(BuildStatus::Succeeded)),
        ModuleBuildState::Failed => Ok(Some(BuildStatus::Failed)),
        ModuleBuildState::Other(state_name) => {
            debug!(build_id, state = %state_name, "Module build still in progress");
            Ok(None)
        }
    }
}

#[instrument(skip(state, build), fields(build_id = %build.id))]
pub async fn check_build_status(state: Arc<ServerState>, build: MBuild) -> Result<StatusOutcome> {
    let txn = state.db.begin().await.context("Failed to begin transaction")?;

    let Some(build) = lock_build(&txn, build.id, &BuildFilter::building())
        .await
        .context("Failed to lock build")?
    else {
        debug!("Build is no longer building");
        return Ok(StatusOutcome::AlreadyReconciled);
    };

    let status = match build.backend()? {
        BuildBackend::Koji { task_id } => koji_task_status(state.koji.as_ref(), task_id).await?,
        BuildBackend::Mbs { build_id } => mbs_build_status(state.mbs.as_ref(), build_id).await?,
    };

    let Some(status) = status else {
        return Ok(StatusOutcome::Unchanged);
    };

    let package_id = build.package;
    update_build_status(&txn, build, status).await?;

    if status == BuildStatus::Succeeded {
        record_package_build(&txn, package_id, Utc::now().naive_utc()).await?;
    }

    txn.commit().await.context("Failed to commit build status")?;

    info!(status = ?status, "Updated build status");
    Ok(StatusOutcome::Updated(status))
}
