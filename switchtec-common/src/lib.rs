// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and wire encodings for Switchtec PCIe switch management.
//!
//! This crate supports both `no_std` and `std` (host) environments:
//! - Default: `no_std` mode, usable from controller-side tooling
//! - `std` feature: Enables `std` support for host tools
//!
//! Nothing here performs I/O. The host library in the `switchtec` crate
//! moves these encodings over the MRPC command channel.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod evcntr;
pub mod image;
pub mod link;
pub mod protocol;

use thiserror::Error;

// Re-export commonly used types
pub use evcntr::{CounterSetup, EventTypeMask, EVENT_TYPES};
pub use image::{ImageError, ImageFooter, ImageHeader, ImageType};
pub use link::PortRecord;
pub use protocol::{BackgroundStatus, DownloadStatus};
pub use protocol::{
    MAX_EVENT_COUNTERS, MAX_PARTS, MAX_PORTS, MAX_STACKS, MRPC_MAX_DATA_LEN,
};

/// A response record from the controller that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record too short: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("unknown {what} code {code:#x}")]
    UnknownCode { what: &'static str, code: u32 },
    #[error("reserved bits set in {what}: {bits:#x}")]
    ReservedBits { what: &'static str, bits: u64 },
}

/// Read a little-endian u32 at `off`. Caller guarantees the bounds.
pub(crate) fn le_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

pub(crate) fn le_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

pub(crate) fn ensure_len(buf: &[u8], need: usize) -> Result<(), DecodeError> {
    if buf.len() < need {
        return Err(DecodeError::Truncated {
            need,
            got: buf.len(),
        });
    }
    Ok(())
}
