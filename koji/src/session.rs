/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Identity};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::KojiError;
use super::types::*;
use super::xmlrpc::{Value, decode_response, encode_call};

/// Fault code the hub answers with once a session has expired.
const AUTH_EXPIRED_CODE: i32 = 1007;

/// The subset of the koji hub API the scheduler relies on.
#[async_trait]
pub trait BuildSystem: Send + Sync {
    async fn get_task_info(&self, task_id: i32) -> Result<TaskInfo, KojiError>;
    async fn get_task_result(&self, task_id: i32) -> Result<Value, KojiError>;
    async fn list_builds(&self, task_id: i32) -> Result<Vec<BuildTask>, KojiError>;
    async fn query_tag_history(&self, build_id: i32) -> Result<Vec<TagHistoryEntry>, KojiError>;
    /// Returns the id of the tag task the hub created.
    async fn tag_build(&self, tag: &str, nvr: &str) -> Result<i32, KojiError>;
    async fn package_list_add(
        &self,
        tag: &str,
        package: &str,
        owner: &str,
    ) -> Result<(), KojiError>;
    async fn list_build_rpms(&self, build_id: i32) -> Result<Vec<Rpm>, KojiError>;
    async fn query_rpm_sigs(&self, rpm_id: i32) -> Result<Vec<RpmSignature>, KojiError>;
    async fn write_signed_rpm(&self, nvr_arch: &str, sigkey: &str) -> Result<(), KojiError>;
}

#[derive(Debug)]
struct SessionAuth {
    id: i64,
    key: String,
    callnum: u64,
}

#[derive(Debug)]
pub struct KojiSession {
    hub_url: String,
    client: Client,
    can_login: bool,
    auth: Mutex<Option<SessionAuth>>,
}

impl KojiSession {
    /// Anonymous session; calls that modify hub state will be rejected.
    pub fn new(hub_url: impl Into<String>, timeout: Duration) -> Result<Self, KojiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(KojiSession {
            hub_url: hub_url.into().trim_end_matches('/').to_string(),
            client,
            can_login: false,
            auth: Mutex::new(None),
        })
    }

    /// Session that authenticates with an SSL client certificate before the
    /// first call that needs it.
    pub fn with_client_certificate(
        hub_url: impl Into<String>,
        cert_pem: &[u8],
        key_pem: &[u8],
        timeout: Duration,
    ) -> Result<Self, KojiError> {
        let identity = Identity::from_pkcs8_pem(cert_pem, key_pem)?;
        let client = Client::builder()
            .identity(identity)
            .timeout(timeout)
            .build()?;

        Ok(KojiSession {
            hub_url: hub_url.into().trim_end_matches('/').to_string(),
            client,
            can_login: true,
            auth: Mutex::new(None),
        })
    }

    pub fn hub_url(&self) -> &str {
        &self.hub_url
    }

    async fn post(
        &self,
        url: &str,
        body: String,
        auth: Option<&SessionAuth>,
    ) -> Result<Value, KojiError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body);

        if let Some(auth) = auth {
            request = request
                .header("Koji-Session-Id", auth.id.to_string())
                .header("Koji-Session-Key", auth.key.as_str())
                .header("Koji-Session-Callnum", auth.callnum.to_string());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(KojiError::Status(response.status()));
        }

        decode_response(&response.text().await?)
    }

    async fn ssl_login(&self) -> Result<SessionAuth, KojiError> {
        let url = format!("{}/ssllogin", self.hub_url);
        let result = self
            .post(&url, encode_call("sslLogin", &[]), None)
            .await?;

        let id = result
            .get("session-id")
            .and_then(Value::as_i64)
            .ok_or_else(|| KojiError::Login("response without session-id".to_string()))?;
        let key = result
            .get("session-key")
            .and_then(Value::as_str)
            .ok_or_else(|| KojiError::Login("response without session-key".to_string()))?
            .to_string();

        info!(session_id = id, hub = %self.hub_url, "Logged in to koji hub");

        Ok(SessionAuth {
            id,
            key,
            callnum: 0,
        })
    }

    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value, KojiError> {
        debug!(method, "Calling koji hub");
        self.post(&self.hub_url, encode_call(method, params), None)
            .await
    }

    /// Calls a method that requires a logged in session. Calls are
    /// serialized so the hub sees strictly increasing call numbers.
    pub async fn call_authenticated(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Value, KojiError> {
        if !self.can_login {
            return Err(KojiError::Login(format!(
                "{} requires a client certificate",
                method
            )));
        }

        let mut guard = self.auth.lock().await;
        if guard.is_none() {
            *guard = Some(self.ssl_login().await?);
        }

        let Some(auth) = guard.as_mut() else {
            return Err(KojiError::Login("no session".to_string()));
        };

        debug!(method, callnum = auth.callnum, "Calling koji hub");
        let result = self
            .post(&self.hub_url, encode_call(method, params), Some(&*auth))
            .await;
        auth.callnum += 1;

        if let Err(KojiError::Fault { code, .. }) = &result {
            if *code == AUTH_EXPIRED_CODE {
                warn!("Koji session expired, logging in again on next call");
                *guard = None;
            }
        }

        result
    }
}

#[async_trait]
impl BuildSystem for KojiSession {
    async fn get_task_info(&self, task_id: i32) -> Result<TaskInfo, KojiError> {
        let result = self
            .call(
                "getTaskInfo",
                &[
                    Value::from(task_id),
                    Value::kwargs([("request", Value::from(true))]),
                ],
            )
            .await?;

        if result.is_nil() {
            return Err(KojiError::decode(format!("task {} does not exist", task_id)));
        }

        TaskInfo::from_value(&result)
    }

    async fn get_task_result(&self, task_id: i32) -> Result<Value, KojiError> {
        self.call("getTaskResult", &[Value::from(task_id)]).await
    }

    async fn list_builds(&self, task_id: i32) -> Result<Vec<BuildTask>, KojiError> {
        let result = self
            .call(
                "listBuilds",
                &[Value::kwargs([("taskID", Value::from(task_id))])],
            )
            .await?;

        BuildTask::list_from_value(&result)
    }

    async fn query_tag_history(&self, build_id: i32) -> Result<Vec<TagHistoryEntry>, KojiError> {
        let result = self
            .call(
                "queryHistory",
                &[Value::kwargs([("build", Value::from(build_id))])],
            )
            .await?;

        TagHistoryEntry::list_from_history(&result)
    }

    async fn tag_build(&self, tag: &str, nvr: &str) -> Result<i32, KojiError> {
        let result = self
            .call_authenticated("tagBuild", &[Value::from(tag), Value::from(nvr)])
            .await?;

        result
            .as_i32()
            .ok_or_else(|| KojiError::decode("tagBuild did not return a task id"))
    }

    async fn package_list_add(
        &self,
        tag: &str,
        package: &str,
        owner: &str,
    ) -> Result<(), KojiError> {
        self.call_authenticated(
            "packageListAdd",
            &[Value::from(tag), Value::from(package), Value::from(owner)],
        )
        .await?;

        Ok(())
    }

    async fn list_build_rpms(&self, build_id: i32) -> Result<Vec<Rpm>, KojiError> {
        let result = self
            .call("listBuildRPMs", &[Value::from(build_id)])
            .await?;

        Rpm::list_from_value(&result)
    }

    async fn query_rpm_sigs(&self, rpm_id: i32) -> Result<Vec<RpmSignature>, KojiError> {
        let result = self
            .call(
                "queryRPMSigs",
                &[Value::kwargs([("rpm_id", Value::from(rpm_id))])],
            )
            .await?;

        RpmSignature::list_from_value(&result)
    }

    async fn write_signed_rpm(&self, nvr_arch: &str, sigkey: &str) -> Result<(), KojiError> {
        self.call_authenticated(
            "writeSignedRPM",
            &[Value::from(nvr_arch), Value::from(sigkey)],
        )
        .await?;

        Ok(())
    }
}
