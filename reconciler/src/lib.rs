/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod scheduler;
pub mod signing;
pub mod status;


use distrobuild_core::types::ServerState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn start_reconciler(
    state: Arc<ServerState>,
    shutdown: CancellationToken,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut handles = vec![tokio::spawn(scheduler::status_loop(
        Arc::clone(&state),
        shutdown.clone(),
    ))];

    if state.cli.disable_sigul {
        info!("Signing is disabled, unsigned builds will not be processed");
    } else {
        handles.push(tokio::spawn(scheduler::signing_loop(
            Arc::clone(&state),
            shutdown,
        )));
    }

    Ok(handles)
}
