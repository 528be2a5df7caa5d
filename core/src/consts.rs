/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub const MBS_MODULE_BUILDS_PATH: &str = "module-build-service/1/module-builds";

pub const DB_MAX_CONNECTIONS: u32 = 20;
pub const DB_MIN_CONNECTIONS: u32 = 2;
pub const DB_TIMEOUT_SECS: u64 = 8;
