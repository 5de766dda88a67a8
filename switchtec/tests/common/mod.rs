// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory switch controller used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use switchtec::common::evcntr::{
    EVCNTR_GET, EVCNTR_GET_BOTH, EVCNTR_GET_SETUP, EVCNTR_HDR_LEN, EVCNTR_SETUP,
};
use switchtec::common::image::ImageFooter;
use switchtec::common::link::PortRecord;
use switchtec::common::protocol::*;
use switchtec::{BackgroundStatus, CounterSetup, Device, DownloadStatus, PollConfig, Transport};

/// MRPC return code for an opcode the simulator does not implement.
pub const ERR_CMD_INVALID: u32 = 0x64001;

pub const FLASH_SIZE: usize = 0x30000;

/// (type, start, len) of the simulated flash layout.
pub const LAYOUT: [(u8, u32, u32); 8] = [
    (0x0, 0x0000_0000, 0x1000),
    (0x1, 0x0000_1000, 0x1000),
    (0x2, 0x0000_2000, 0x1000),
    (0x3, 0x0001_0000, 0x8000),
    (0x4, 0x0002_0000, 0x2000),
    (0x5, 0x0002_2000, 0x2000),
    (0x6, 0x0002_4000, 0x1000),
    (0x7, 0x0001_8000, 0x8000),
];

pub struct SimState {
    pub submissions: Vec<(u32, Vec<u8>)>,
    pending: Option<Vec<u8>>,
    pub overlapping_submits: u32,

    pub flash: Vec<u8>,
    pub partitions: HashMap<u8, PartitionEntry>,

    pub download: Vec<u8>,
    pub download_started: bool,
    pub dont_activate: Option<bool>,
    pub dl_status: DownloadStatus,
    pub bg_status: BackgroundStatus,
    /// Status replies served after the first download block, in order.
    pub script: VecDeque<(DownloadStatus, BackgroundStatus)>,
    pub toggles: Vec<(bool, bool)>,

    pub counters: Vec<Vec<(CounterSetup, u32)>>,
    pub ports: Vec<PortRecord>,

    pub busy_submits: u32,
    pub short_reply: bool,
    pub resets: u32,
}

#[derive(Clone)]
pub struct SimController {
    pub state: Arc<Mutex<SimState>>,
}

impl SimController {
    pub fn new() -> Self {
        let partitions = LAYOUT
            .iter()
            .map(|&(ty, start, len)| {
                (
                    ty,
                    PartitionEntry {
                        part_start: start,
                        part_len: len,
                        active: matches!(ty, 0x3 | 0x4),
                        valid: false,
                    },
                )
            })
            .collect();

        let mut ports = vec![PortRecord::unpopulated(); MAX_PORTS];
        ports[0] = PortRecord {
            phys_port_id: 0,
            partition: 0,
            log_port_id: 0,
            stack_port: 0x00,
            cfg_width: 16,
            neg_width: 16,
            upstream: true,
            linkup_linkrate: 0x80 | 4,
            ltssm: 0x0103,
        };

        Self {
            state: Arc::new(Mutex::new(SimState {
                submissions: Vec::new(),
                pending: None,
                overlapping_submits: 0,
                flash: vec![0xFF; FLASH_SIZE],
                partitions,
                download: Vec::new(),
                download_started: false,
                dont_activate: None,
                dl_status: DownloadStatus::Ready,
                bg_status: BackgroundStatus::NotStarted,
                script: VecDeque::new(),
                toggles: Vec::new(),
                counters: vec![vec![(CounterSetup::default(), 0); MAX_EVENT_COUNTERS]; MAX_STACKS],
                ports,
                busy_submits: 0,
                short_reply: false,
                resets: 0,
            })),
        }
    }

    /// A device on this simulator that polls without delay.
    pub fn device(&self) -> Device {
        Device::with_transport("sim", self.clone()).with_poll_config(PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn submission_count(&self) -> usize {
        self.with(|s| s.submissions.len())
    }

    pub fn opcodes(&self) -> Vec<u32> {
        self.with(|s| s.submissions.iter().map(|(op, _)| *op).collect())
    }

    /// Write `payload` plus a valid footer into the partition of `ty`.
    pub fn install_image(&self, ty: u8, payload: &[u8], version: u32) -> ImageFooter {
        let footer = ImageFooter::seal(payload, 0xA000_0000, version).unwrap();
        self.with(|s| {
            let part = s.partitions.get_mut(&ty).unwrap();
            part.valid = true;
            let start = part.part_start as usize;
            let end = start + part.part_len as usize;
            s.flash[start..start + payload.len()].copy_from_slice(payload);
            s.flash[end - footer.to_bytes().len()..end].copy_from_slice(&footer.to_bytes());
        });
        footer
    }

    pub fn set_ports(&self, records: &[PortRecord]) {
        self.with(|s| {
            s.ports = vec![PortRecord::unpopulated(); MAX_PORTS];
            s.ports[..records.len()].copy_from_slice(records);
        });
    }

    pub fn script(&self, steps: &[(DownloadStatus, BackgroundStatus)]) {
        self.with(|s| s.script.extend(steps.iter().copied()));
    }
}

impl Transport for SimController {
    fn submit(&mut self, opcode: u32, payload: &[u8]) -> io::Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.pending.is_some() {
            s.overlapping_submits += 1;
        }
        if s.busy_submits > 0 {
            s.busy_submits -= 1;
            return Err(io::Error::new(io::ErrorKind::ResourceBusy, "busy"));
        }

        s.submissions.push((opcode, payload.to_vec()));
        let (code, data) = s.execute(opcode, payload);

        let mut resp = code.to_le_bytes().to_vec();
        resp.extend_from_slice(&data);
        if s.short_reply {
            resp.truncate(resp.len().saturating_sub(1).max(4));
        }
        s.pending = Some(resp);
        Ok(())
    }

    fn read_response(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.state.lock().unwrap();
        let resp = s
            .pending
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no command pending"))?;
        let n = resp.len().min(buf.len());
        buf[..n].copy_from_slice(&resp[..n]);
        Ok(n)
    }
}

impl SimState {
    fn execute(&mut self, opcode: u32, payload: &[u8]) -> (u32, Vec<u8>) {
        match opcode {
            MRPC_ECHO => {
                let v = u32::from_le_bytes(payload[..4].try_into().unwrap());
                (0, (!v).to_le_bytes().to_vec())
            }
            MRPC_RESET => {
                self.resets += 1;
                (0, Vec::new())
            }
            MRPC_FWDNLD => self.fwdnld(payload),
            MRPC_RD_FLASH => {
                let addr = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
                let len = u32::from_le_bytes(payload[4..8].try_into().unwrap()) as usize;
                let data = (addr..addr + len)
                    .map(|a| self.flash.get(a).copied().unwrap_or(0xFF))
                    .collect();
                (0, data)
            }
            MRPC_PART_INFO => match self.partitions.get(&payload[1]) {
                Some(entry) => (0, entry.to_bytes().to_vec()),
                None => (ERR_CMD_INVALID, Vec::new()),
            },
            MRPC_EVCNTR => self.evcntr(payload),
            MRPC_LNKSTAT => (0, self.ports.iter().flat_map(|p| p.to_bytes()).collect()),
            _ => (ERR_CMD_INVALID, Vec::new()),
        }
    }

    fn fwdnld(&mut self, payload: &[u8]) -> (u32, Vec<u8>) {
        match payload[0] {
            FWDNLD_GET_STATUS => {
                if self.download_started || !self.toggles.is_empty() {
                    if let Some((dl, bg)) = self.script.pop_front() {
                        self.dl_status = dl;
                        self.bg_status = bg;
                    }
                }
                (0, vec![self.dl_status.code(), self.bg_status.code(), 0, 0])
            }
            FWDNLD_DOWNLOAD => {
                let hdr = DownloadBlockHeader::from_bytes(payload).unwrap();
                let data = &payload[FWDNLD_HDR_LEN..];
                assert_eq!(data.len(), hdr.block_len as usize);

                self.download_started = true;
                self.dont_activate = Some(hdr.dont_activate);
                if hdr.offset as usize != self.download.len() {
                    self.dl_status = DownloadStatus::OffsetIncorrect;
                    self.bg_status = BackgroundStatus::Done;
                    return (0, Vec::new());
                }
                self.download.extend_from_slice(data);

                self.dl_status = if self.download.len() == hdr.image_len as usize {
                    DownloadStatus::Complete
                } else {
                    DownloadStatus::InProgress
                };
                self.bg_status = BackgroundStatus::Done;
                (0, Vec::new())
            }
            FWDNLD_TOGGLE => {
                let (fw, cfg) = (payload[1] != 0, payload[2] != 0);
                self.toggles.push((fw, cfg));
                if fw {
                    self.flip(0x3, 0x7);
                }
                if cfg {
                    self.flip(0x4, 0x5);
                }
                self.dl_status = if fw {
                    DownloadStatus::ActivatedFirmware
                } else {
                    DownloadStatus::ActivatedData
                };
                self.bg_status = BackgroundStatus::Done;
                (0, Vec::new())
            }
            _ => (ERR_CMD_INVALID, Vec::new()),
        }
    }

    fn flip(&mut self, a: u8, b: u8) {
        for ty in [a, b] {
            let part = self.partitions.get_mut(&ty).unwrap();
            part.active = !part.active;
        }
    }

    fn evcntr(&mut self, payload: &[u8]) -> (u32, Vec<u8>) {
        let (sub, stack, first, count) = (
            payload[0],
            payload[1] as usize,
            payload[2] as usize,
            payload[3] as usize,
        );
        let slots = &mut self.counters[stack][first..first + count];

        match sub {
            EVCNTR_SETUP => {
                let setup = CounterSetup::from_bytes(&payload[EVCNTR_HDR_LEN..]).unwrap();
                slots[0].0 = setup;
                (0, Vec::new())
            }
            EVCNTR_GET | EVCNTR_GET_SETUP | EVCNTR_GET_BOTH => {
                let clear = payload[EVCNTR_HDR_LEN] != 0;
                let mut out = Vec::new();
                for (setup, cnt) in slots.iter_mut() {
                    if sub != EVCNTR_GET {
                        out.extend_from_slice(&setup.to_bytes());
                    }
                    if sub != EVCNTR_GET_SETUP {
                        out.extend_from_slice(&cnt.to_le_bytes());
                    }
                    if clear {
                        *cnt = 0;
                    }
                }
                (0, out)
            }
            _ => (ERR_CMD_INVALID, Vec::new()),
        }
    }
}
