/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for build and package persistence

use chrono::NaiveDate;
use clap::Parser;
use distrobuild_core::database::*;
use distrobuild_core::types::*;
use entity::build::BuildStatus;
use sea_orm::{
    DatabaseBackend, DatabaseConnection, EntityTrait, MockDatabase, QueryFilter, QueryTrait,
};
use uuid::Uuid;

fn timestamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn build_model(status: BuildStatus) -> MBuild {
    MBuild {
        id: Uuid::new_v4(),
        package: Uuid::new_v4(),
        status,
        koji_id: Some(1001),
        mbs_id: None,
        signed: false,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

fn koji_build_succeeded() -> MBuild {
    build_model(BuildStatus::Succeeded)
}

fn package_model(id: Uuid) -> MPackage {
    MPackage {
        id,
        name: "bash".to_string(),
        last_build: None,
        created_at: timestamp(),
    }
}

fn executed_sql(db: DatabaseConnection) -> Vec<String> {
    db.into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().to_vec())
        .map(|stmt| stmt.to_string())
        .collect()
}

fn parse_cli(extra: &[&str]) -> Cli {
    let required = [
        "distrobuild-scheduler",
        "--koji-hub-url",
        "https://koji.example.org/kojihub",
        "--mbs-url",
        "https://mbs.example.org",
        "--compose-tag",
        "dist-compose",
    ];

    Cli::try_parse_from(required.iter().chain(extra.iter()).copied()).unwrap()
}

#[test]
fn test_pool_size_default_concurrency() {
    assert_eq!(pool_size(&parse_cli(&[])), 22);
    assert_eq!(pool_size(&parse_cli(&["--disable-sigul"])), 20);
}

#[test]
fn test_pool_size_grows_with_concurrency() {
    let cli = parse_cli(&["--max-concurrent-reconciliations", "50"]);
    assert_eq!(pool_size(&cli), 102);

    let cli = parse_cli(&["--max-concurrent-reconciliations", "50", "--disable-sigul"]);
    assert_eq!(pool_size(&cli), 52);
}

#[test]
fn test_building_filter_sql() {
    let sql = EBuild::find()
        .filter(BuildFilter::building().condition())
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#""build"."status" = 0"#));
    assert!(!sql.contains(r#""build"."signed" = "#));
}

#[test]
fn test_unsigned_filter_sql() {
    let sql = EBuild::find()
        .filter(BuildFilter::unsigned().condition())
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#""build"."status" = 1"#));
    assert!(sql.contains(r#""build"."signed" = "#));
    assert!(sql.contains(r#""build"."koji_id" IS NOT NULL"#));
}

#[tokio::test]
async fn test_find_builds() {
    let first = build_model(BuildStatus::Building);
    let second = build_model(BuildStatus::Building);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![first.clone(), second.clone()]])
        .into_connection();

    let builds = find_builds(&db, &BuildFilter::building()).await.unwrap();
    assert_eq!(builds, vec![first, second]);
}

#[tokio::test]
async fn test_lock_build_already_handled() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<MBuild>::new()])
        .into_connection();

    let locked = lock_build(&db, Uuid::new_v4(), &BuildFilter::building())
        .await
        .unwrap();

    assert!(locked.is_none());
}

#[tokio::test]
async fn test_update_build_status() {
    let build = build_model(BuildStatus::Building);
    let mut updated = build.clone();
    updated.status = BuildStatus::Failed;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![updated.clone()]])
        .into_connection();

    let result = update_build_status(&db, build, BuildStatus::Failed)
        .await
        .unwrap();

    assert_eq!(result.status, BuildStatus::Failed);
}

#[tokio::test]
async fn test_terminal_status_is_final() {
    let build = build_model(BuildStatus::Cancelled);
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = update_build_status(&db, build, BuildStatus::Succeeded)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cannot become"));
}

#[tokio::test]
async fn test_save_build_rejects_signed_failure() {
    let mut build = build_model(BuildStatus::Failed);
    build.signed = true;
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    assert!(save_build(&db, build).await.is_err());
}

#[tokio::test]
async fn test_mark_build_signed() {
    let build = koji_build_succeeded();
    let mut updated = build.clone();
    updated.signed = true;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![updated]])
        .into_connection();

    let result = mark_build_signed(&db, build).await.unwrap();
    assert!(result.signed);

    let sql = executed_sql(db);
    assert_eq!(sql.len(), 1);
    assert!(sql[0].starts_with(r#"UPDATE "build" SET "status" = 1, "signed" = TRUE"#));
}

#[tokio::test]
async fn test_find_builds_with_package_skips_orphans() {
    let build = build_model(BuildStatus::Succeeded);
    let package = package_model(build.package);
    let orphan = build_model(BuildStatus::Succeeded);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            (build.clone(), Some(package.clone())),
            (orphan, None::<MPackage>),
        ]])
        .into_connection();

    let rows = find_builds_with_package(&db, &BuildFilter::unsigned())
        .await
        .unwrap();

    assert_eq!(rows, vec![(build, package)]);

    let sql = executed_sql(db);
    assert!(sql[0].contains(r#"LEFT JOIN "package""#));
    assert!(sql[0].contains(r#""build"."koji_id" IS NOT NULL"#));
}

#[tokio::test]
async fn test_record_package_build() {
    let package = package_model(Uuid::new_v4());
    let mut updated = package.clone();
    updated.last_build = Some(timestamp());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![package.clone()]])
        .append_query_results([vec![updated]])
        .into_connection();

    let result = record_package_build(&db, package.id, timestamp())
        .await
        .unwrap();

    assert_eq!(result.last_build, Some(timestamp()));

    let sql = executed_sql(db);
    assert_eq!(sql.len(), 2);
    assert!(sql[0].contains("FOR UPDATE"));
    assert!(sql[1].starts_with(r#"UPDATE "package" SET "last_build" = '2024-01-01 00:00:00"#));
}

#[tokio::test]
async fn test_record_package_build_missing_package() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<MPackage>::new()])
        .into_connection();

    let err = record_package_build(&db, Uuid::new_v4(), timestamp())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not found"));
}
