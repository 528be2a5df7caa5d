/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for build entity

use chrono::NaiveDate;
use entity::build::{BuildBackend, BuildStatus, InvariantError};
use entity::*;
use sea_orm::{DatabaseBackend, MockDatabase, entity::prelude::*};
use uuid::Uuid;

fn build_model(koji_id: Option<i32>, mbs_id: Option<i32>) -> build::Model {
    let naive_date = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    build::Model {
        id: Uuid::new_v4(),
        package: Uuid::new_v4(),
        status: BuildStatus::Building,
        koji_id,
        mbs_id,
        signed: false,
        created_at: naive_date,
        updated_at: naive_date,
    }
}

#[tokio::test]
async fn test_build_entity_with_status() -> Result<(), DbErr> {
    let mut model = build_model(Some(42), None);
    model.status = BuildStatus::Succeeded;
    let build_id = model.id;
    let package_id = model.package;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model]])
        .into_connection();

    let result = build::Entity::find_by_id(build_id).one(&db).await?;

    assert!(result.is_some());
    let build = result.unwrap();
    assert_eq!(build.status, BuildStatus::Succeeded);
    assert_eq!(build.package, package_id);
    assert_eq!(build.koji_id, Some(42));
    assert!(!build.signed);

    Ok(())
}

#[test]
fn test_backend_from_koji_task() {
    let build = build_model(Some(42), None);
    assert_eq!(build.backend(), Ok(BuildBackend::Koji { task_id: 42 }));
}

#[test]
fn test_backend_from_mbs_build() {
    let build = build_model(None, Some(7));
    assert_eq!(build.backend(), Ok(BuildBackend::Mbs { build_id: 7 }));
}

#[test]
fn test_backend_rejects_both_ids() {
    let build = build_model(Some(42), Some(7));
    assert_eq!(
        build.backend(),
        Err(InvariantError::AmbiguousBackend(build.id, 42, 7))
    );
}

#[test]
fn test_backend_rejects_missing_ids() {
    let build = build_model(None, None);
    assert_eq!(build.backend(), Err(InvariantError::MissingBackend(build.id)));
}

#[test]
fn test_validate_signed_requires_success() {
    let mut build = build_model(Some(42), None);
    build.signed = true;
    assert_eq!(
        build.validate(),
        Err(InvariantError::SignedWithoutSuccess(
            build.id,
            BuildStatus::Building
        ))
    );

    build.status = BuildStatus::Succeeded;
    assert!(build.validate().is_ok());
}
