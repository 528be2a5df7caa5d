/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::Result;
use distrobuild_core::database::*;
use distrobuild_core::types::*;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::signing::sign_unsigned_build;
use super::status::check_build_status;

/// Outcome counts of one cycle. `reconciled` only counts builds whose row was
/// changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub reconciled: usize,
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, build_id: Uuid, result: Result<Result<bool>, JoinError>, action: &str) {
        match result {
            Ok(Ok(true)) => self.reconciled += 1,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                error!(build_id = %build_id, error = %format!("{:#}", e), "Failed to {}", action);
                self.failed += 1;
            }
            Err(e) => {
                error!(build_id = %build_id, error = %e, "Task to {} panicked", action);
                self.failed += 1;
            }
        }
    }
}

/// Runs `cycle` once per `period` until `shutdown` is cancelled. The first
/// cycle starts immediately, late ticks are delayed instead of bunched up.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = CycleReport>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(task = name, period = period.as_secs(), "Reconciliation loop started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        debug!(task = name, "Running reconciliation cycle");

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            report = cycle() => {
                info!(
                    task = name,
                    candidates = report.candidates,
                    reconciled = report.reconciled,
                    failed = report.failed,
                    "Reconciliation cycle finished"
                );
            }
        }
    }

    info!(task = name, "Reconciliation loop stopped");
}

pub async fn status_loop(state: Arc<ServerState>, shutdown: CancellationToken) {
    let period = state.cli.status_interval();
    run_periodic("check_build_status", period, shutdown, || {
        check_builds_cycle(Arc::clone(&state))
    })
    .await;
}

pub async fn signing_loop(state: Arc<ServerState>, shutdown: CancellationToken) {
    let period = state.cli.signing_interval();
    run_periodic("sign_unsigned_builds", period, shutdown, || {
        sign_builds_cycle(Arc::clone(&state))
    })
    .await;
}

pub async fn check_builds_cycle(state: Arc<ServerState>) -> CycleReport {
    match find_builds(&state.db, &BuildFilter::building()).await {
        Ok(builds) => reconcile_builds(state, builds).await,
        Err(e) => {
            error!(error = %e, "Failed to query building builds");
            CycleReport::default()
        }
    }
}

pub async fn reconcile_builds(state: Arc<ServerState>, builds: Vec<MBuild>) -> CycleReport {
    let mut report = CycleReport {
        candidates: builds.len(),
        ..Default::default()
    };

    let limit = state.cli.max_concurrent_reconciliations;
    let results = stream::iter(builds)
        .map(|build| {
            let build_id = build.id;
            let unit = tokio::spawn(check_build_status(Arc::clone(&state), build));
            async move { (build_id, unit.await.map(|r| r.map(|o| o.is_change()))) }
        })
        .buffer_unordered(limit)
        .collect::<Vec<_>>()
        .await;

    for (build_id, result) in results {
        report.record(build_id, result, "check build status");
    }

    report
}

pub async fn sign_builds_cycle(state: Arc<ServerState>) -> CycleReport {
    match find_builds_with_package(&state.db, &BuildFilter::unsigned()).await {
        Ok(candidates) => sign_builds(state, candidates).await,
        Err(e) => {
            error!(error = %e, "Failed to query unsigned builds");
            CycleReport::default()
        }
    }
}

pub async fn sign_builds(state: Arc<ServerState>, candidates: Vec<(MBuild, MPackage)>) -> CycleReport {
    let mut report = CycleReport {
        candidates: candidates.len(),
        ..Default::default()
    };

    let limit = state.cli.max_concurrent_reconciliations;
    let results = stream::iter(candidates)
        .map(|(build, package)| {
            let build_id = build.id;
            let unit = tokio::spawn(sign_unsigned_build(Arc::clone(&state), build, package));
            async move { (build_id, unit.await.map(|r| r.map(|o| o.is_change()))) }
        })
        .buffer_unordered(limit)
        .collect::<Vec<_>>()
        .await;

    for (build_id, result) in results {
        report.record(build_id, result, "sign build");
    }

    report
}
