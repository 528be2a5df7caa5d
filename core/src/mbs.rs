/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::consts::MBS_MODULE_BUILDS_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleBuildState {
    Ready,
    Failed,
    Other(String),
}

impl From<&str> for ModuleBuildState {
    fn from(state_name: &str) -> Self {
        match state_name {
            "ready" => ModuleBuildState::Ready,
            "failed" => ModuleBuildState::Failed,
            other => ModuleBuildState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleBuild {
    pub id: i32,
    pub state_name: String,
}

impl ModuleBuild {
    pub fn state(&self) -> ModuleBuildState {
        ModuleBuildState::from(self.state_name.as_str())
    }
}

#[async_trait]
pub trait ModuleBuildService: Send + Sync {
    async fn get_build(&self, build_id: i32) -> Result<ModuleBuild>;
}

#[derive(Debug, Clone)]
pub struct MbsClient {
    base_url: String,
    client: Client,
}

impl MbsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build MBS http client")?;

        Ok(MbsClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn build_url(&self, build_id: i32) -> String {
        format!("{}/{}/{}", self.base_url, MBS_MODULE_BUILDS_PATH, build_id)
    }
}

#[async_trait]
impl ModuleBuildService for MbsClient {
    async fn get_build(&self, build_id: i32) -> Result<ModuleBuild> {
        let url = self.build_url(build_id);
        debug!(build_id, url = %url, "Querying module build");

        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query MBS build {}", build_id))?
            .error_for_status()
            .with_context(|| format!("MBS rejected query for build {}", build_id))?
            .json::<ModuleBuild>()
            .await
            .with_context(|| format!("Failed to parse MBS build {}", build_id))
    }
}
