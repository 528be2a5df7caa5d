/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use thiserror::Error;

/// Fault codes of the koji error classes deriving from `BuildError`.
pub const BUILD_ERROR_CODES: [i32; 4] = [1005, 1010, 1011, 1012];

/// Koji's own error classes use fault codes from this range. Anything outside
/// of it is a plain XML-RPC fault that the hub did not classify.
pub const KOJI_ERROR_CODES: std::ops::RangeInclusive<i32> = 1000..=1099;

#[derive(Debug, Error)]
pub enum KojiError {
    #[error("koji fault {code}: {message}")]
    Fault { code: i32, message: String },
    #[error("failed to reach koji hub: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("koji hub answered with HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed xml-rpc document: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid escape in xml-rpc document: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("unexpected xml-rpc response: {0}")]
    Decode(String),
    #[error("koji session login failed: {0}")]
    Login(String),
}

/// How a failed hub call should be treated by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The hub reported a `BuildError` or one of its subclasses.
    BuildError,
    /// Any other koji error class, `GenericError` being the base of all.
    GenericError,
    /// An XML-RPC fault the hub did not map to a koji error class.
    RpcFault,
    /// The call never produced a fault: network, HTTP or decoding failure.
    Connection,
}

impl KojiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KojiError::Fault { code, .. } if BUILD_ERROR_CODES.contains(code) => {
                ErrorKind::BuildError
            }
            KojiError::Fault { code, .. } if KOJI_ERROR_CODES.contains(code) => {
                ErrorKind::GenericError
            }
            KojiError::Fault { .. } => ErrorKind::RpcFault,
            _ => ErrorKind::Connection,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        KojiError::Decode(message.into())
    }
}
