/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Client for the koji build system hub.
//!
//! Only the calls needed to follow build tasks, tag builds and store RPM
//! signatures are implemented. [`BuildSystem`] is the seam callers depend on;
//! [`KojiSession`] talks to a real hub over XML-RPC.

pub mod error;
pub mod session;
pub mod types;
pub mod xmlrpc;

pub use error::{ErrorKind, KojiError};
pub use session::{BuildSystem, KojiSession};
pub use types::*;
pub use xmlrpc::Value;
