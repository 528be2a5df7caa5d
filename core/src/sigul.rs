/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, info};

#[async_trait]
pub trait SigningService: Send + Sync {
    /// Signs one RPM, addressed as `N-V-R.A`, and stores the signature in koji.
    async fn sign(&self, nvr_arch: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SigulClient {
    pub binpath: String,
    pub config_file: Option<String>,
    pub key_name: String,
    pub passphrase: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SigulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigulClient")
            .field("binpath", &self.binpath)
            .field("config_file", &self.config_file)
            .field("key_name", &self.key_name)
            .field("passphrase", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SigulClient {
    pub fn sign_rpm_args(&self, nvr_arch: &str) -> Vec<String> {
        let mut args = vec!["--batch".to_string()];

        if let Some(config_file) = &self.config_file {
            args.push("--config-file".to_string());
            args.push(config_file.clone());
        }

        args.extend([
            "sign-rpm".to_string(),
            "--store-in-koji".to_string(),
            "--koji-only".to_string(),
            self.key_name.clone(),
            nvr_arch.to_string(),
        ]);

        args
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        let mut child = Command::new(&self.binpath)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.binpath))?;

        // In batch mode sigul reads NUL terminated passphrases from stdin.
        let mut stdin = child
            .stdin
            .take()
            .context("Failed to open sigul stdin")?;
        stdin
            .write_all(format!("{}\0", self.passphrase).as_bytes())
            .await
            .context("Failed to write passphrase to sigul")?;
        drop(stdin);

        let output = child.wait_with_output().await.context("Failed to wait for sigul")?;

        if !output.status.success() {
            anyhow::bail!(
                "sigul exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl SigningService for SigulClient {
    async fn sign(&self, nvr_arch: &str) -> Result<()> {
        debug!(nvr_arch, key = %self.key_name, "Invoking sigul");

        time::timeout(self.timeout, self.run(self.sign_rpm_args(nvr_arch)))
            .await
            .with_context(|| {
                format!(
                    "Signing {} timed out after {}s",
                    nvr_arch,
                    self.timeout.as_secs()
                )
            })??;

        info!(nvr_arch, key = %self.key_name, "Signed RPM");
        Ok(())
    }
}
