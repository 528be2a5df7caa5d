/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use distrobuild_core::mbs::{ModuleBuild, ModuleBuildService};
use distrobuild_core::sigul::SigningService;
use distrobuild_core::types::{Cli, ServerState};
use mockall::mock;
use reconciler::start_reconciler;
use sea_orm::{DatabaseBackend, MockDatabase};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mock! {
    pub Mbs {}

    #[async_trait]
    impl ModuleBuildService for Mbs {
        async fn get_build(&self, build_id: i32) -> anyhow::Result<ModuleBuild>;
    }
}

mock! {
    pub Signer {}

    #[async_trait]
    impl SigningService for Signer {
        async fn sign(&self, nvr_arch: &str) -> anyhow::Result<()>;
    }
}

fn create_mock_cli(disable_sigul: bool) -> Cli {
    Cli {
        log_level: "info".to_string(),
        log_json: false,
        database_url: Some("mock://test".to_string()),
        database_url_file: None,
        koji_hub_url: "https://koji.example.org/kojihub".to_string(),
        koji_cert_file: None,
        koji_key_file: None,
        koji_package_owner: "distrobuild".to_string(),
        mbs_url: "https://mbs.example.org".to_string(),
        compose_tag: "dist-c8-compose".to_string(),
        disable_sigul,
        sigul_binpath: "sigul".to_string(),
        sigul_config_file: None,
        sigul_key_name: None,
        sigul_key_id: None,
        sigul_passphrase_file: None,
        status_interval: 300,
        signing_interval: 300,
        max_concurrent_reconciliations: 10,
        rpc_timeout: 60,
        sign_timeout: 600,
        tag_poll_interval: 5,
        tag_timeout: 600,
        sentry_dsn: None,
    }
}

fn create_mock_state(disable_sigul: bool) -> Arc<ServerState> {
    let cli = create_mock_cli(disable_sigul);
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let koji = koji::KojiSession::new(cli.koji_hub_url.clone(), cli.rpc_timeout()).unwrap();

    Arc::new(ServerState {
        db,
        cli,
        koji: Arc::new(koji),
        mbs: Arc::new(MockMbs::new()),
        signer: Arc::new(MockSigner::new()),
    })
}

async fn start_and_stop(state: Arc<ServerState>) -> usize {
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let handles = start_reconciler(state, shutdown).await.unwrap();
    let count = handles.len();

    for handle in handles {
        handle.await.unwrap();
    }

    count
}

#[test]
fn test_start_reconciler() {
    let loops = tokio_test::block_on(start_and_stop(create_mock_state(false)));
    assert_eq!(loops, 2);
}

#[tokio::test]
async fn test_start_reconciler_without_signing() {
    let loops = start_and_stop(create_mock_state(true)).await;
    assert_eq!(loops, 1);
}
