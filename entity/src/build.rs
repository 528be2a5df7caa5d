/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveActiveEnum, EnumIter, Deserialize, Serialize)]
#[sea_orm(rs_type = "i16", db_type = "Integer")]
pub enum BuildStatus {
    #[sea_orm(num_value = 0)]
    Building,
    #[sea_orm(num_value = 1)]
    Succeeded,
    #[sea_orm(num_value = 2)]
    Failed,
    #[sea_orm(num_value = 3)]
    Cancelled,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildStatus::Building)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "build")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub package: Uuid,
    pub status: BuildStatus,
    pub koji_id: Option<i32>,
    pub mbs_id: Option<i32>,
    pub signed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::Package",
        to = "super::package::Column::Id"
    )]
    Package,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The backend a build was submitted to. A build row stores this as two
/// nullable columns; exactly one of them may be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildBackend {
    Koji { task_id: i32 },
    Mbs { build_id: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("build {0} has neither a koji task nor an mbs build")]
    MissingBackend(Uuid),
    #[error("build {0} references both koji task {1} and mbs build {2}")]
    AmbiguousBackend(Uuid, i32, i32),
    #[error("build {0} is marked signed while in status {1:?}")]
    SignedWithoutSuccess(Uuid, BuildStatus),
}

impl Model {
    pub fn backend(&self) -> Result<BuildBackend, InvariantError> {
        match (self.koji_id, self.mbs_id) {
            (Some(task_id), None) => Ok(BuildBackend::Koji { task_id }),
            (None, Some(build_id)) => Ok(BuildBackend::Mbs { build_id }),
            (Some(task_id), Some(build_id)) => {
                Err(InvariantError::AmbiguousBackend(self.id, task_id, build_id))
            }
            (None, None) => Err(InvariantError::MissingBackend(self.id)),
        }
    }

    /// Checks every invariant a persisted build row must satisfy.
    pub fn validate(&self) -> Result<(), InvariantError> {
        self.backend()?;

        if self.signed && self.status != BuildStatus::Succeeded {
            return Err(InvariantError::SignedWithoutSuccess(self.id, self.status));
        }

        Ok(())
    }
}
