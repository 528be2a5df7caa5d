/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};

pub fn greater_than_zero<
    T: std::str::FromStr + std::cmp::PartialOrd + std::fmt::Display + Default,
>(
    s: &str,
) -> Result<T, String> {
    let num: T = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number", s))?;

    if num > T::default() {
        Ok(num)
    } else {
        Err(format!("`{}` is not larger than 0", s))
    }
}

/// Koji tag names are limited to ascii alphanumerics and `-_.+`.
pub fn valid_tag_name(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("tag name cannot be empty".to_string());
    }

    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')))
    {
        return Err(format!("tag name `{}` contains invalid character `{}`", s, c));
    }

    Ok(s.to_string())
}

/// Reads a secret from a file, dropping the trailing newline editors add.
pub fn read_secret_file(path: &str) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secret file {}", path))?;

    Ok(content.trim_end_matches(['\r', '\n']).to_string())
}
