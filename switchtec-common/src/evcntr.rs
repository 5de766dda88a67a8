// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Event counter configuration and its MRPC encoding.
//!
//! Each stack owns a bank of `MAX_EVENT_COUNTERS` counters. A counter
//! watches a set of ports for a set of event kinds in one direction and
//! may carry a threshold.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::protocol::{MAX_EVENT_COUNTERS, MAX_PORTS, MRPC_MAX_DATA_LEN};
use crate::{ensure_len, le_u32, DecodeError};

pub const EVCNTR_SETUP: u8 = 1;
pub const EVCNTR_GET: u8 = 2;
pub const EVCNTR_GET_SETUP: u8 = 3;
pub const EVCNTR_GET_BOTH: u8 = 4;

/// sub_cmd, stack, first counter, counter count
pub const EVCNTR_HDR_LEN: usize = 4;

/// Header plus clear flag and padding, sent by every getter.
pub const EVCNTR_GET_REQ_LEN: usize = EVCNTR_HDR_LEN + 4;

/// port_mask:u64, type_mask:24|egress:8, threshold
pub const SETUP_RECORD_LEN: usize = 16;
pub const COUNT_RECORD_LEN: usize = 4;
pub const BOTH_RECORD_LEN: usize = SETUP_RECORD_LEN + COUNT_RECORD_LEN;

const TYPE_MASK_BITS: u32 = 0x00FF_FFFF;

bitflags! {
    /// Event kinds a counter can count.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[serde(transparent)]
    pub struct EventTypeMask: u32 {
        const UNSUP_REQ_ERR = 1 << 0;
        const ECRC_ERR = 1 << 1;
        const MALFORM_TLP_ERR = 1 << 2;
        const RCVR_OFLOW_ERR = 1 << 3;
        const CMPLTR_ABORT_ERR = 1 << 4;
        const POISONED_TLP_ERR = 1 << 5;
        const SURPRISE_DOWN_ERR = 1 << 6;
        const DATA_LINK_PROTO_ERR = 1 << 7;
        const HDR_LOG_OFLOW_ERR = 1 << 8;
        const UNCOR_INT_ERR = 1 << 9;
        const REPLAY_TMR_TIMEOUT = 1 << 10;
        const REPLAY_NUM_ROLLOVER = 1 << 11;
        const BAD_DLPP = 1 << 12;
        const BAD_TLP = 1 << 13;
        const RCVR_ERR = 1 << 14;
        const RCV_FATAL_MSG = 1 << 15;
        const RCV_NON_FATAL_MSG = 1 << 16;
        const RCV_CORR_MSG = 1 << 17;
        const NAK_RCVD = 1 << 18;
        const RULE_TABLE_HIT = 1 << 19;
        const POSTED_TLP = 1 << 20;
        const COMP_TLP = 1 << 21;
        const NON_POSTED_TLP = 1 << 22;

        const ALL_ERRORS = Self::UNSUP_REQ_ERR.bits()
            | Self::ECRC_ERR.bits()
            | Self::MALFORM_TLP_ERR.bits()
            | Self::RCVR_OFLOW_ERR.bits()
            | Self::CMPLTR_ABORT_ERR.bits()
            | Self::POISONED_TLP_ERR.bits()
            | Self::SURPRISE_DOWN_ERR.bits()
            | Self::DATA_LINK_PROTO_ERR.bits()
            | Self::HDR_LOG_OFLOW_ERR.bits()
            | Self::UNCOR_INT_ERR.bits()
            | Self::REPLAY_TMR_TIMEOUT.bits()
            | Self::REPLAY_NUM_ROLLOVER.bits()
            | Self::BAD_DLPP.bits()
            | Self::BAD_TLP.bits()
            | Self::RCVR_ERR.bits()
            | Self::RCV_FATAL_MSG.bits()
            | Self::RCV_NON_FATAL_MSG.bits()
            | Self::RCV_CORR_MSG.bits()
            | Self::NAK_RCVD.bits();
        const ALL_TLPS = Self::POSTED_TLP.bits()
            | Self::COMP_TLP.bits()
            | Self::NON_POSTED_TLP.bits();
        const ALL = (1 << 23) - 1;
    }
}

/// One countable event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType {
    pub mask: EventTypeMask,
    pub name: &'static str,
    pub help: &'static str,
}

const fn ev(mask: EventTypeMask, name: &'static str, help: &'static str) -> EventType {
    EventType { mask, name, help }
}

/// Catalogue of the single-bit event kinds, in bit order.
pub const EVENT_TYPES: [EventType; 23] = [
    ev(EventTypeMask::UNSUP_REQ_ERR, "UNSUP_REQ_ERR", "Unsupported Request Error"),
    ev(EventTypeMask::ECRC_ERR, "ECRC_ERR", "ECRC Error"),
    ev(EventTypeMask::MALFORM_TLP_ERR, "MALFORM_TLP_ERR", "Malformed TLP Error"),
    ev(EventTypeMask::RCVR_OFLOW_ERR, "RCVR_OFLOW_ERR", "Receiver Overflow Error"),
    ev(EventTypeMask::CMPLTR_ABORT_ERR, "CMPLTR_ABORT_ERR", "Completer Abort Error"),
    ev(EventTypeMask::POISONED_TLP_ERR, "POISONED_TLP_ERR", "Poisoned TLP Error"),
    ev(EventTypeMask::SURPRISE_DOWN_ERR, "SURPRISE_DOWN_ERR", "Surprise Down Error"),
    ev(EventTypeMask::DATA_LINK_PROTO_ERR, "DATA_LINK_PROTO_ERR", "Data Link Protocol Error"),
    ev(EventTypeMask::HDR_LOG_OFLOW_ERR, "HDR_LOG_OFLOW_ERR", "Header Log Overflow Error"),
    ev(EventTypeMask::UNCOR_INT_ERR, "UNCOR_INT_ERR", "Uncorrectable Internal Error"),
    ev(EventTypeMask::REPLAY_TMR_TIMEOUT, "REPLAY_TMR_TIMEOUT", "Replay Timer Timeout"),
    ev(EventTypeMask::REPLAY_NUM_ROLLOVER, "REPLAY_NUM_ROLLOVER", "Replay Number Rollover"),
    ev(EventTypeMask::BAD_DLPP, "BAD_DLPP", "Bad DLLP"),
    ev(EventTypeMask::BAD_TLP, "BAD_TLP", "Bad TLP"),
    ev(EventTypeMask::RCVR_ERR, "RCVR_ERR", "Receiver Error"),
    ev(EventTypeMask::RCV_FATAL_MSG, "RCV_FATAL_MSG", "Receive FATAL Error Message"),
    ev(EventTypeMask::RCV_NON_FATAL_MSG, "RCV_NON_FATAL_MSG", "Receive Non-FATAL Error Message"),
    ev(EventTypeMask::RCV_CORR_MSG, "RCV_CORR_MSG", "Receive Correctable Error Message"),
    ev(EventTypeMask::NAK_RCVD, "NAK_RCVD", "NAK Received"),
    ev(EventTypeMask::RULE_TABLE_HIT, "RULE_TABLE_HIT", "Rule Search Table Rule Hit"),
    ev(EventTypeMask::POSTED_TLP, "POSTED_TLP", "Posted TLP"),
    ev(EventTypeMask::COMP_TLP, "COMP_TLP", "Completion TLP"),
    ev(EventTypeMask::NON_POSTED_TLP, "NON_POSTED_TLP", "Non-Posted TLP"),
];

impl EventTypeMask {
    /// Number of single-bit event kinds.
    pub const fn type_count() -> usize {
        EVENT_TYPES.len()
    }

    /// Names of the single-bit kinds contained in this mask, in bit order.
    pub fn type_names(self) -> impl Iterator<Item = &'static str> {
        EVENT_TYPES
            .iter()
            .filter(move |t| self.contains(t.mask))
            .map(|t| t.name)
    }

    /// Parse a comma-separated list of names, unions included
    /// (e.g. `"ECRC_ERR,ALL_TLPS"`). Names are case-insensitive.
    pub fn parse_list(list: &str) -> Option<Self> {
        let mut mask = Self::empty();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let flag = Self::all()
                .iter_names()
                .chain(Self::named_unions())
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, f)| f)?;
            mask |= flag;
        }
        Some(mask)
    }

    fn named_unions() -> impl Iterator<Item = (&'static str, Self)> {
        [
            ("ALL_ERRORS", Self::ALL_ERRORS),
            ("ALL_TLPS", Self::ALL_TLPS),
            ("ALL", Self::ALL),
        ]
        .into_iter()
    }
}

/// Configuration of one counter slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSetup {
    /// One bit per stack port; only the low `MAX_PORTS` bits may be set.
    pub port_mask: u64,
    pub type_mask: EventTypeMask,
    pub egress: bool,
    pub threshold: u32,
}

impl CounterSetup {
    pub const PORT_MASK_LIMIT: u64 = (1 << MAX_PORTS) - 1;

    pub fn to_bytes(&self) -> [u8; SETUP_RECORD_LEN] {
        let mut buf = [0u8; SETUP_RECORD_LEN];
        let type_word = (self.type_mask.bits() & TYPE_MASK_BITS) | ((self.egress as u32) << 24);
        buf[0..8].copy_from_slice(&self.port_mask.to_le_bytes());
        buf[8..12].copy_from_slice(&type_word.to_le_bytes());
        buf[12..16].copy_from_slice(&self.threshold.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(buf, SETUP_RECORD_LEN)?;

        let port_mask = u64::from_le_bytes([
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ]);
        if port_mask & !Self::PORT_MASK_LIMIT != 0 {
            return Err(DecodeError::ReservedBits {
                what: "port mask",
                bits: port_mask & !Self::PORT_MASK_LIMIT,
            });
        }

        let type_word = le_u32(buf, 8);
        let type_bits = type_word & TYPE_MASK_BITS;
        let type_mask =
            EventTypeMask::from_bits(type_bits).ok_or(DecodeError::ReservedBits {
                what: "event type mask",
                bits: (type_bits & !EventTypeMask::ALL.bits()) as u64,
            })?;

        Ok(Self {
            port_mask,
            type_mask,
            egress: (type_word >> 24) != 0,
            threshold: le_u32(buf, 12),
        })
    }
}

/// Payload that programs one counter slot.
pub fn setup_request(
    stack: u8,
    counter: u8,
    setup: &CounterSetup,
) -> [u8; EVCNTR_HDR_LEN + SETUP_RECORD_LEN] {
    let mut buf = [0u8; EVCNTR_HDR_LEN + SETUP_RECORD_LEN];
    buf[..EVCNTR_HDR_LEN].copy_from_slice(&[EVCNTR_SETUP, stack, counter, 1]);
    buf[EVCNTR_HDR_LEN..].copy_from_slice(&setup.to_bytes());
    buf
}

/// Payload of a ranged counter read. `clear` zeroes the counters as part
/// of the same controller-side read.
pub fn get_request(
    sub_cmd: u8,
    stack: u8,
    first: u8,
    count: u8,
    clear: bool,
) -> [u8; EVCNTR_GET_REQ_LEN] {
    [sub_cmd, stack, first, count, clear as u8, 0, 0, 0]
}

/// Response record size for a getter sub-command.
pub fn record_len(sub_cmd: u8) -> Option<usize> {
    match sub_cmd {
        EVCNTR_GET => Some(COUNT_RECORD_LEN),
        EVCNTR_GET_SETUP => Some(SETUP_RECORD_LEN),
        EVCNTR_GET_BOTH => Some(BOTH_RECORD_LEN),
        _ => None,
    }
}

/// Most counters whose records fit in a single response.
pub fn max_counters_per_read(record_len: usize) -> usize {
    (MRPC_MAX_DATA_LEN / record_len).min(MAX_EVENT_COUNTERS)
}
