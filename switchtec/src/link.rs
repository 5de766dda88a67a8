// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Per-port link status.

use switchtec_common::link::{lnkstat_request, LNKSTAT_RESP_LEN, PORT_RECORD_LEN};
use switchtec_common::protocol::MRPC_LNKSTAT;
use switchtec_common::PortRecord;

use crate::device::Device;
use crate::error::{Error, Result};

/// Names LTSSM state codes for display.
pub trait LtssmTable: Send + Sync {
    fn describe(&self, ltssm: u16) -> String;
}

/// Fallback table: the raw code in hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexLtssm;

impl LtssmTable for HexLtssm {
    fn describe(&self, ltssm: u16) -> String {
        format!("{:#06x}", ltssm)
    }
}

impl<F> LtssmTable for F
where
    F: Fn(u16) -> String + Send + Sync,
{
    fn describe(&self, ltssm: u16) -> String {
        self(ltssm)
    }
}

/// Link state of one populated port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub partition: u8,
    pub stack: u8,
    pub upstream_port: bool,
    pub stack_port_id: u8,
    pub physical_port_id: u8,
    pub logical_port_id: u8,
    pub configured_width: u8,
    pub negotiated_width: u8,
    pub link_up: bool,
    pub link_rate: u8,
    pub ltssm: u16,
    pub ltssm_str: String,
}

impl Device {
    /// Link status of every populated port, in the controller's port order.
    pub fn status(&self) -> Result<Vec<PortStatus>> {
        let resp = self.call(MRPC_LNKSTAT, &lnkstat_request(), LNKSTAT_RESP_LEN)?;
        let table = self.ltssm_table();

        let mut ports = Vec::new();
        for rec in resp.chunks_exact(PORT_RECORD_LEN) {
            let rec = PortRecord::from_bytes(rec).map_err(|source| Error::Malformed {
                opcode: MRPC_LNKSTAT,
                source,
            })?;
            if !rec.is_populated() {
                continue;
            }

            ports.push(PortStatus {
                partition: rec.partition,
                stack: rec.stack(),
                upstream_port: rec.upstream,
                stack_port_id: rec.stack_port_id(),
                physical_port_id: rec.phys_port_id,
                logical_port_id: rec.log_port_id,
                configured_width: rec.cfg_width,
                negotiated_width: rec.neg_width,
                link_up: rec.link_up(),
                link_rate: rec.link_rate(),
                ltssm: rec.ltssm,
                ltssm_str: table.describe(rec.ltssm),
            });
        }
        Ok(ports)
    }
}
