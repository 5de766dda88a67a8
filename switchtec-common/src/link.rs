// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Per-port link status records returned by MRPC_LNKSTAT.

use serde::{Deserialize, Serialize};

use crate::protocol::{MAX_PORTS, MAX_STACKS};
use crate::{ensure_len, le_u16, DecodeError};

pub const PORT_RECORD_LEN: usize = 12;

/// Size of the full link-status response.
pub const LNKSTAT_RESP_LEN: usize = PORT_RECORD_LEN * MAX_PORTS;

/// Request every port the switch has.
pub fn lnkstat_request() -> [u8; 8] {
    ((1u64 << MAX_PORTS) - 1).to_le_bytes()
}

/// One port's entry in the link-status table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortRecord {
    pub phys_port_id: u8,
    pub partition: u8,
    pub log_port_id: u8,
    /// Stack number in the high nibble, port within the stack in the low.
    pub stack_port: u8,
    pub cfg_width: u8,
    pub neg_width: u8,
    pub upstream: bool,
    /// Bit 7: link up. Bits 0..7: negotiated rate (PCIe generation).
    pub linkup_linkrate: u8,
    pub ltssm: u16,
}

impl PortRecord {
    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, PORT_RECORD_LEN)?;
        Ok(Self {
            phys_port_id: buf[0],
            partition: buf[1],
            log_port_id: buf[2],
            stack_port: buf[3],
            cfg_width: buf[4],
            neg_width: buf[5],
            upstream: buf[6] != 0,
            linkup_linkrate: buf[7],
            ltssm: le_u16(buf, 8),
        })
    }

    pub fn to_bytes(&self) -> [u8; PORT_RECORD_LEN] {
        let mut buf = [0u8; PORT_RECORD_LEN];
        buf[0] = self.phys_port_id;
        buf[1] = self.partition;
        buf[2] = self.log_port_id;
        buf[3] = self.stack_port;
        buf[4] = self.cfg_width;
        buf[5] = self.neg_width;
        buf[6] = self.upstream as u8;
        buf[7] = self.linkup_linkrate;
        buf[8..10].copy_from_slice(&self.ltssm.to_le_bytes());
        buf
    }

    /// Record for a port slot the switch does not populate.
    pub fn unpopulated() -> Self {
        Self {
            stack_port: 0xFF,
            ..Self::default()
        }
    }

    pub fn stack(&self) -> u8 {
        self.stack_port >> 4
    }

    pub fn stack_port_id(&self) -> u8 {
        self.stack_port & 0x0F
    }

    pub fn is_populated(&self) -> bool {
        (self.stack() as usize) < MAX_STACKS
    }

    pub fn link_up(&self) -> bool {
        self.linkup_linkrate & 0x80 != 0
    }

    pub fn link_rate(&self) -> u8 {
        self.linkup_linkrate & 0x7F
    }
}
