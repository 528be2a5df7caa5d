/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use distrobuild_core::database::*;
use distrobuild_core::types::*;
use entity::build::BuildBackend;
use koji::{BuildSystem, BuildTask, RpmSignature, TagHistoryEntry, TaskState};
use sea_orm::TransactionTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningOutcome {
    Signed {
        signed_rpms: usize,
        tagged_builds: usize,
    },
    /// Signed or otherwise changed by a concurrent run.
    AlreadySigned,
    /// Module builds are signed by their own pipeline.
    NotEligible,
    Disabled,
}

impl SigningOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, SigningOutcome::Signed { .. })
    }
}

pub fn is_tagged(history: &[TagHistoryEntry], tag: &str) -> bool {
    history.iter().any(|entry| entry.tag_name == tag)
}

/// Key ids are hex strings, koji reports them lower case.
pub fn has_signature(signatures: &[RpmSignature], key_id: &str) -> bool {
    signatures
        .iter()
        .any(|signature| signature.sigkey.eq_ignore_ascii_case(key_id))
}

async fn poll_task(koji: &dyn BuildSystem, task_id: i32, poll_interval: Duration) -> Result<()> {
    loop {
        let task_info = koji
            .get_task_info(task_id)
            .await
            .with_context(|| format!("Failed to get info for koji task {}", task_id))?;

        match task_info.state {
            TaskState::Closed => return Ok(()),
            TaskState::Canceled | TaskState::Failed => {
                anyhow::bail!("Koji task {} ended as {:?}", task_id, task_info.state)
            }
            TaskState::Free | TaskState::Open | TaskState::Assigned => {
                debug!(task_id, state = ?task_info.state, "Waiting for koji task");
                time::sleep(poll_interval).await;
            }
        }
    }
}

/// Polls a koji task until it closes. Fails if it ends any other way or
/// `timeout` passes first.
pub async fn wait_for_task(
    koji: &dyn BuildSystem,
    task_id: i32,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    time::timeout(timeout, poll_task(koji, task_id, poll_interval))
        .await
        .with_context(|| {
            format!(
                "Koji task {} did not finish within {}s",
                task_id,
                timeout.as_secs()
            )
        })?
}

/// Returns whether a tag operation was needed.
async fn ensure_tagged(state: &ServerState, build_task: &BuildTask, tag: &str) -> Result<bool> {
    let history = state
        .koji
        .query_tag_history(build_task.build_id)
        .await
        .with_context(|| format!("Failed to query history of build {}", build_task.nvr))?;

    if is_tagged(&history, tag) {
        debug!(nvr = %build_task.nvr, tag, "Build already tagged");
        return Ok(false);
    }

    let tag_task = state
        .koji
        .tag_build(tag, &build_task.nvr)
        .await
        .with_context(|| format!("Failed to tag {} into {}", build_task.nvr, tag))?;

    info!(nvr = %build_task.nvr, tag, task_id = tag_task, "Tagging build");

    wait_for_task(
        state.koji.as_ref(),
        tag_task,
        state.cli.tag_poll_interval(),
        state.cli.tag_timeout(),
    )
    .await?;

    Ok(true)
}

#[instrument(skip(state, build, package), fields(build_id = %build.id, package = %package.name))]
pub async fn sign_unsigned_build(
    state: Arc<ServerState>,
    build: MBuild,
    package: MPackage,
) -> Result<SigningOutcome> {
    if state.cli.disable_sigul {
        return Ok(SigningOutcome::Disabled);
    }

    let task_id = match build.backend()? {
        BuildBackend::Koji { task_id } => task_id,
        BuildBackend::Mbs { .. } => {
            debug!("Skipping module build");
            return Ok(SigningOutcome::NotEligible);
        }
    };

    let key_id = state
        .cli
        .sigul_key_id
        .as_deref()
        .context("No signing key id configured")?;
    let compose_tag = state.cli.compose_tag.as_str();

    let txn = state.db.begin().await.context("Failed to begin transaction")?;

    let Some(build) = lock_build(&txn, build.id, &BuildFilter::unsigned())
        .await
        .context("Failed to lock build")?
    else {
        debug!("Build is no longer waiting for signing");
        return Ok(SigningOutcome::AlreadySigned);
    };

    state
        .koji
        .package_list_add(compose_tag, &package.name, &state.cli.koji_package_owner)
        .await
        .with_context(|| format!("Failed to add {} to {}", package.name, compose_tag))?;

    let build_tasks = state
        .koji
        .list_builds(task_id)
        .await
        .with_context(|| format!("Failed to list builds of koji task {}", task_id))?;

    let mut tagged_builds = 0;
    for build_task in &build_tasks {
        if ensure_tagged(&state, build_task, compose_tag).await? {
            tagged_builds += 1;
        }
    }

    let mut signed_rpms = 0;
    let mut failed_rpms = 0;

    for build_task in &build_tasks {
        let rpms = state
            .koji
            .list_build_rpms(build_task.build_id)
            .await
            .with_context(|| format!("Failed to list RPMs of {}", build_task.nvr))?;

        for rpm in rpms {
            let nvr_arch = rpm.nvr_arch();

            let signatures = state
                .koji
                .query_rpm_sigs(rpm.id)
                .await
                .with_context(|| format!("Failed to query signatures of {}", nvr_arch))?;

            if has_signature(&signatures, key_id) {
                debug!(nvr_arch = %nvr_arch, "RPM already signed");
                continue;
            }

            if let Err(e) = state.signer.sign(&nvr_arch).await {
                error!(nvr_arch = %nvr_arch, error = %format!("{:#}", e), "Failed to sign RPM");
                failed_rpms += 1;
                continue;
            }

            state
                .koji
                .write_signed_rpm(&nvr_arch, key_id)
                .await
                .with_context(|| format!("Failed to write signed copy of {}", nvr_arch))?;

            signed_rpms += 1;
        }
    }

    if failed_rpms > 0 {
        anyhow::bail!(
            "{} RPMs could not be signed, {} were signed",
            failed_rpms,
            signed_rpms
        );
    }

    mark_build_signed(&txn, build).await?;
    txn.commit().await.context("Failed to commit signed build")?;

    info!(signed_rpms, tagged_builds, "Build signed");
    Ok(SigningOutcome::Signed {
        signed_rpms,
        tagged_builds,
    })
}
