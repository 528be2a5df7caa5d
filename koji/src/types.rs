/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::error::KojiError;
use super::xmlrpc::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Free,
    Open,
    Closed,
    Canceled,
    Assigned,
    Failed,
}

impl TaskState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TaskState::Free),
            1 => Some(TaskState::Open),
            2 => Some(TaskState::Closed),
            3 => Some(TaskState::Canceled),
            4 => Some(TaskState::Assigned),
            5 => Some(TaskState::Failed),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TaskState::Closed | TaskState::Canceled | TaskState::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: i32,
    pub state: TaskState,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub build_id: i32,
    pub nvr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHistoryEntry {
    pub tag_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpm {
    pub id: i32,
    pub nvr: String,
    pub arch: String,
}

impl Rpm {
    /// The `N-V-R.A` form sigul and `writeSignedRPM` address an RPM by.
    pub fn nvr_arch(&self) -> String {
        format!("{}.{}", self.nvr, self.arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmSignature {
    pub rpm_id: i32,
    pub sigkey: String,
}

fn field_i32(value: &Value, key: &str) -> Result<i32, KojiError> {
    value
        .get(key)
        .and_then(Value::as_i32)
        .ok_or_else(|| KojiError::decode(format!("missing integer field `{}`", key)))
}

fn field_str(value: &Value, key: &str) -> Result<String, KojiError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| KojiError::decode(format!("missing string field `{}`", key)))
}

fn list<T>(
    value: &Value,
    parse: impl Fn(&Value) -> Result<T, KojiError>,
) -> Result<Vec<T>, KojiError> {
    value
        .as_array()
        .ok_or_else(|| KojiError::decode("expected an array"))?
        .iter()
        .map(parse)
        .collect()
}

impl TaskInfo {
    pub fn from_value(value: &Value) -> Result<Self, KojiError> {
        let state = value
            .get("state")
            .and_then(Value::as_i64)
            .ok_or_else(|| KojiError::decode("task info without state"))?;

        Ok(TaskInfo {
            id: field_i32(value, "id")?,
            state: TaskState::from_code(state)
                .ok_or_else(|| KojiError::decode(format!("unknown task state {}", state)))?,
            method: value
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

impl BuildTask {
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, KojiError> {
        list(value, |build| {
            Ok(BuildTask {
                build_id: field_i32(build, "build_id")?,
                nvr: field_str(build, "nvr")?,
            })
        })
    }
}

impl TagHistoryEntry {
    /// Extracts the `tag_listing` table from a `queryHistory` result.
    pub fn list_from_history(value: &Value) -> Result<Vec<Self>, KojiError> {
        match value.get("tag_listing") {
            Some(listing) => list(listing, |entry| {
                Ok(TagHistoryEntry {
                    tag_name: field_str(entry, "tag.name")?,
                    active: entry
                        .get("active")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
            }),
            None => Ok(vec![]),
        }
    }
}

impl Rpm {
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, KojiError> {
        list(value, |rpm| {
            Ok(Rpm {
                id: field_i32(rpm, "id")?,
                nvr: field_str(rpm, "nvr")?,
                arch: field_str(rpm, "arch")?,
            })
        })
    }
}

impl RpmSignature {
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, KojiError> {
        list(value, |sig| {
            Ok(RpmSignature {
                rpm_id: field_i32(sig, "rpm_id")?,
                sigkey: field_str(sig, "sigkey")?,
            })
        })
    }
}
