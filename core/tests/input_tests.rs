/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Tests for input validation and parsing functions

use distrobuild_core::input::*;
use std::io::Write;

#[test]
fn test_greater_than_zero() {
    let num = greater_than_zero::<u32>("1").unwrap();
    assert_eq!(num, 1);

    let num = greater_than_zero::<usize>("0").unwrap_err();
    assert_eq!(num, "`0` is not larger than 0");

    let num = greater_than_zero::<u64>("-3").unwrap_err();
    assert_eq!(num, "`-3` is not a valid number");

    let num = greater_than_zero::<u64>("abc").unwrap_err();
    assert_eq!(num, "`abc` is not a valid number");
}

#[test]
fn test_valid_tag_name() {
    assert_eq!(valid_tag_name("dist-c8-compose").unwrap(), "dist-c8-compose");
    assert_eq!(valid_tag_name("el8_4.0+build").unwrap(), "el8_4.0+build");

    let err = valid_tag_name("").unwrap_err();
    assert_eq!(err, "tag name cannot be empty");

    let err = valid_tag_name("bad tag").unwrap_err();
    assert_eq!(err, "tag name `bad tag` contains invalid character ` `");

    assert!(valid_tag_name("tag/slash").is_err());
}

#[test]
fn test_read_secret_file_strips_newline() {
    let path = std::env::temp_dir().join(format!("distrobuild-secret-{}", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"hunter2\n").unwrap();
    drop(file);

    let secret = read_secret_file(path.to_str().unwrap()).unwrap();
    assert_eq!(secret, "hunter2");

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_read_secret_file_missing() {
    let err = read_secret_file("/nonexistent/distrobuild/secret").unwrap_err();
    assert!(err.to_string().contains("Failed to read secret file"));
}
