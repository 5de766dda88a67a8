// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! MRPC command set shared between host tools and the switch controller.
//!
//! Opcode values and payload layouts are fixed by the controller firmware.
//! All multi-byte fields are little-endian.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{le_u32, DecodeError};

// --- Switch limits ---

pub const MAX_PARTS: usize = 48;
pub const MAX_PORTS: usize = 48;
pub const MAX_STACKS: usize = 8;
pub const MAX_EVENT_COUNTERS: usize = 64;

// --- Command envelope ---

/// Largest payload accepted or returned by a single MRPC command.
pub const MRPC_MAX_DATA_LEN: usize = 1024;

/// Size of the return-code word that prefixes every response.
pub const MRPC_STATUS_LEN: usize = 4;

pub const MRPC_FWDNLD: u32 = 5;
pub const MRPC_EVCNTR: u32 = 24;
pub const MRPC_LNKSTAT: u32 = 28;
pub const MRPC_PART_INFO: u32 = 30;
pub const MRPC_ECHO: u32 = 65;
pub const MRPC_RESET: u32 = 72;
pub const MRPC_RD_FLASH: u32 = 80;

// --- Firmware download (MRPC_FWDNLD) ---

pub const FWDNLD_GET_STATUS: u8 = 0;
pub const FWDNLD_DOWNLOAD: u8 = 1;
pub const FWDNLD_TOGGLE: u8 = 2;

/// Download chunk header: subcmd, dont_activate, rsvd[2], offset, img_length, blk_length.
pub const FWDNLD_HDR_LEN: usize = 16;

/// Largest image block carried by one download command.
pub const FWDNLD_MAX_BLOCK: usize = MRPC_MAX_DATA_LEN - FWDNLD_HDR_LEN;

/// Background-status response: op status, bg_status, rsvd[2].
pub const BG_STATUS_RESP_LEN: usize = 4;

// --- Flash read (MRPC_RD_FLASH) ---

pub const RD_FLASH_HDR_LEN: usize = 8;

/// Largest window returned by one flash read.
pub const RD_FLASH_MAX_CHUNK: usize = MRPC_MAX_DATA_LEN - RD_FLASH_HDR_LEN;

// --- Partition info (MRPC_PART_INFO) ---

pub const PART_INFO_GET: u8 = 0;
pub const PART_INFO_RESP_LEN: usize = 12;

// --- Reset (MRPC_RESET) ---

pub const RESET_HARD: u32 = 0;

// --- Background status codes ---

pub const BG_STAT_IDLE: u8 = 0;
pub const BG_STAT_INPROGRESS: u8 = 1;
pub const BG_STAT_DONE: u8 = 2;
pub const BG_STAT_ERROR: u8 = 0xFF;

/// State of a long-running command executing on the controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStatus {
    NotStarted,
    InProgress,
    Done,
    Failed(u8),
}

impl BackgroundStatus {
    /// Any code other than idle/in-progress/done is a failure report.
    pub fn from_code(code: u8) -> Self {
        match code {
            BG_STAT_IDLE => Self::NotStarted,
            BG_STAT_INPROGRESS => Self::InProgress,
            BG_STAT_DONE => Self::Done,
            other => Self::Failed(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::NotStarted => BG_STAT_IDLE,
            Self::InProgress => BG_STAT_INPROGRESS,
            Self::Done => BG_STAT_DONE,
            Self::Failed(code) => code,
        }
    }

    /// Done or failed: polling again will not change the answer.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Firmware download state as reported by the controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Ready = 0,
    InProgress = 1,
    HeaderIncorrect = 2,
    OffsetIncorrect = 3,
    CrcIncorrect = 4,
    LengthIncorrect = 5,
    HardwareError = 6,
    Complete = 7,
    ActivatedFirmware = 8,
    ActivatedData = 9,
}

impl DownloadStatus {
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        Ok(match code {
            0 => Self::Ready,
            1 => Self::InProgress,
            2 => Self::HeaderIncorrect,
            3 => Self::OffsetIncorrect,
            4 => Self::CrcIncorrect,
            5 => Self::LengthIncorrect,
            6 => Self::HardwareError,
            7 => Self::Complete,
            8 => Self::ActivatedFirmware,
            9 => Self::ActivatedData,
            other => {
                return Err(DecodeError::UnknownCode {
                    what: "download status",
                    code: other as u32,
                })
            }
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_terminal_success(self) -> bool {
        matches!(
            self,
            Self::Complete | Self::ActivatedFirmware | Self::ActivatedData
        )
    }

    pub fn is_activated(self) -> bool {
        matches!(self, Self::ActivatedFirmware | Self::ActivatedData)
    }

    /// The controller rejected the image contents or framing.
    pub fn is_mismatch(self) -> bool {
        matches!(
            self,
            Self::HeaderIncorrect
                | Self::OffsetIncorrect
                | Self::CrcIncorrect
                | Self::LengthIncorrect
        )
    }

    pub fn is_terminal_failure(self) -> bool {
        self.is_mismatch() || self == Self::HardwareError
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::InProgress => "download in progress",
            Self::HeaderIncorrect => "image header is incorrect",
            Self::OffsetIncorrect => "block offset is incorrect",
            Self::CrcIncorrect => "image CRC is incorrect",
            Self::LengthIncorrect => "image length is incorrect",
            Self::HardwareError => "hardware error",
            Self::Complete => "download complete",
            Self::ActivatedFirmware => "firmware download successful and activated",
            Self::ActivatedData => "data download successful and activated",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// --- Request encoders ---

/// Payload of a background-status query. Every long-running command
/// family answers it with `BG_STATUS_RESP_LEN` bytes.
pub fn bg_status_request() -> [u8; 4] {
    (FWDNLD_GET_STATUS as u32).to_le_bytes()
}

/// Header that precedes each image block in a download command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadBlockHeader {
    pub dont_activate: bool,
    pub offset: u32,
    pub image_len: u32,
    pub block_len: u32,
}

impl DownloadBlockHeader {
    pub fn to_bytes(&self) -> [u8; FWDNLD_HDR_LEN] {
        let mut buf = [0u8; FWDNLD_HDR_LEN];
        buf[0] = FWDNLD_DOWNLOAD;
        buf[1] = self.dont_activate as u8;
        buf[4..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.image_len.to_le_bytes());
        buf[12..16].copy_from_slice(&self.block_len.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        crate::ensure_len(buf, FWDNLD_HDR_LEN)?;
        if buf[0] != FWDNLD_DOWNLOAD {
            return Err(DecodeError::UnknownCode {
                what: "download subcommand",
                code: buf[0] as u32,
            });
        }
        Ok(Self {
            dont_activate: buf[1] != 0,
            offset: le_u32(buf, 4),
            image_len: le_u32(buf, 8),
            block_len: le_u32(buf, 12),
        })
    }
}

/// Payload of the toggle-active-partition command.
pub fn toggle_request(toggle_fw: bool, toggle_cfg: bool) -> [u8; 3] {
    [FWDNLD_TOGGLE, toggle_fw as u8, toggle_cfg as u8]
}

/// Payload of a flash read covering `[addr, addr + len)`.
pub fn rd_flash_request(addr: u32, len: u32) -> [u8; RD_FLASH_HDR_LEN] {
    let mut buf = [0u8; RD_FLASH_HDR_LEN];
    buf[0..4].copy_from_slice(&addr.to_le_bytes());
    buf[4..8].copy_from_slice(&len.to_le_bytes());
    buf
}

/// Partition table entry as returned by MRPC_PART_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    pub part_start: u32,
    pub part_len: u32,
    pub active: bool,
    pub valid: bool,
}

impl PartitionEntry {
    pub fn request(image_type: u8) -> [u8; 4] {
        [PART_INFO_GET, image_type, 0, 0]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        crate::ensure_len(buf, PART_INFO_RESP_LEN)?;
        Ok(Self {
            part_start: le_u32(buf, 0),
            part_len: le_u32(buf, 4),
            active: buf[8] != 0,
            valid: buf[9] != 0,
        })
    }

    pub fn to_bytes(&self) -> [u8; PART_INFO_RESP_LEN] {
        let mut buf = [0u8; PART_INFO_RESP_LEN];
        buf[0..4].copy_from_slice(&self.part_start.to_le_bytes());
        buf[4..8].copy_from_slice(&self.part_len.to_le_bytes());
        buf[8] = self.active as u8;
        buf[9] = self.valid as u8;
        buf
    }
}
