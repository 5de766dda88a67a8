// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types for switch management operations.

use std::io;
use std::time::Duration;

use switchtec_common::{DecodeError, DownloadStatus, ImageError};
use thiserror::Error;

/// Result type alias for switch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an [`Error`], used to decide how a caller reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command channel itself failed.
    Transport,
    /// The controller answered with something malformed or undersized.
    Protocol,
    /// The controller is still busy with an earlier long-running command.
    Busy,
    /// The request was rejected before anything was sent.
    Validation,
    /// A firmware image failed its magic, length or CRC checks.
    Format,
    /// The controller reported an unrecoverable condition.
    Hardware,
    /// A polling deadline expired.
    Timeout,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("device {name} has been closed")]
    Closed { name: String },

    #[error("I/O error on command channel: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("short response to command {opcode:#x}: expected {expected} bytes, got {actual}")]
    ShortResponse {
        opcode: u32,
        expected: usize,
        actual: usize,
    },

    #[error("malformed response to command {opcode:#x}: {source}")]
    Malformed { opcode: u32, source: DecodeError },

    #[error("echo mismatch: sent {sent:#010x}, expected {expected:#010x}, got {received:#010x}")]
    EchoMismatch {
        sent: u32,
        expected: u32,
        received: u32,
    },

    #[error("controller is busy with a previous command")]
    Busy,

    #[error("command {opcode:#x} failed with controller code {code:#x}")]
    Mrpc { opcode: u32, code: u32 },

    #[error("{what} {value} out of range (must be below {limit})")]
    OutOfRange {
        what: &'static str,
        value: u64,
        limit: u64,
    },

    #[error("payload of {len} bytes exceeds the {max} byte MRPC limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("firmware download rejected: {0}")]
    DownloadRejected(DownloadStatus),

    #[error("controller hardware error (download status: {status}, background code {code:#04x})")]
    Hardware { status: DownloadStatus, code: u8 },

    #[error("timed out after {after:?}{}", last_status(.last))]
    Timeout {
        after: Duration,
        last: Option<DownloadStatus>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Closed { .. } | Self::Io { .. } => ErrorKind::Transport,
            Self::ShortResponse { .. } | Self::Malformed { .. } | Self::EchoMismatch { .. } => {
                ErrorKind::Protocol
            }
            Self::Busy => ErrorKind::Busy,
            Self::OutOfRange { .. } | Self::PayloadTooLarge { .. } | Self::InvalidRequest(_) => {
                ErrorKind::Validation
            }
            Self::Image(_) | Self::DownloadRejected(_) => ErrorKind::Format,
            Self::Mrpc { .. } | Self::Hardware { .. } => ErrorKind::Hardware,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Only a busy controller is worth asking again.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Busy
    }

    pub(crate) fn out_of_range(what: &'static str, value: impl Into<u64>, limit: usize) -> Self {
        Self::OutOfRange {
            what,
            value: value.into(),
            limit: limit as u64,
        }
    }
}

fn last_status(last: &Option<DownloadStatus>) -> String {
    match last {
        Some(status) => format!(" (last status: {status})"),
        None => String::new(),
    }
}
