// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device handle and MRPC command channel.
//!
//! The controller executes one MRPC command at a time. A [`Device`] holds
//! its transport behind a mutex, and [`Device::submit`] keeps that lock in
//! the returned [`PendingResponse`] until the response has been read, so a
//! second request can never overtake an outstanding one. Distinct devices
//! share nothing and run in parallel.

use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use switchtec_common::protocol::{
    MRPC_ECHO, MRPC_MAX_DATA_LEN, MRPC_RESET, MRPC_STATUS_LEN, RESET_HARD,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::link::{HexLtssm, LtssmTable};
use crate::transport::{CharDevTransport, Transport};

/// Default pause between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Default limit on a single polling phase.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long-running commands are polled for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

type Channel = Option<Box<dyn Transport>>;

/// Handle to one switch.
pub struct Device {
    name: String,
    channel: Mutex<Channel>,
    poll: PollConfig,
    ltssm: Box<dyn LtssmTable>,
}

impl Device {
    /// Open the switchtec character device at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let transport = CharDevTransport::open(path)?;
        info!("Opened {}", path.display());
        Ok(Self::with_transport(path.display().to_string(), transport))
    }

    /// Wrap an already-connected transport.
    pub fn with_transport(name: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            name: name.into(),
            channel: Mutex::new(Some(Box::new(transport))),
            poll: PollConfig::default(),
            ltssm: Box::new(HexLtssm),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_ltssm_table(mut self, table: impl LtssmTable + 'static) -> Self {
        self.ltssm = Box::new(table);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    pub fn set_poll_config(&mut self, poll: PollConfig) {
        self.poll = poll;
    }

    pub(crate) fn ltssm_table(&self) -> &dyn LtssmTable {
        self.ltssm.as_ref()
    }

    /// Release the transport. Every later command fails with `Closed`.
    pub fn close(&self) {
        if self.lock().take().is_some() {
            debug!("Closed {}", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Submit a command without waiting for its response.
    ///
    /// The channel stays locked until the returned handle is consumed by
    /// [`PendingResponse::read_response`] or dropped.
    pub fn submit(&self, opcode: u32, payload: &[u8]) -> Result<PendingResponse<'_>> {
        if payload.len() > MRPC_MAX_DATA_LEN {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: MRPC_MAX_DATA_LEN,
            });
        }

        let mut guard = self.lock();
        let transport = guard.as_mut().ok_or_else(|| self.closed())?;

        debug!(opcode, len = payload.len(), "MRPC submit");
        transport
            .submit(opcode, payload)
            .map_err(channel_error)?;

        Ok(PendingResponse {
            guard,
            device: self,
            opcode,
            consumed: false,
        })
    }

    /// Submit a command and block until its `resp_len`-byte response arrives.
    pub fn call(&self, opcode: u32, payload: &[u8], resp_len: usize) -> Result<Vec<u8>> {
        if resp_len > MRPC_MAX_DATA_LEN {
            return Err(Error::PayloadTooLarge {
                len: resp_len,
                max: MRPC_MAX_DATA_LEN,
            });
        }
        self.submit(opcode, payload)?.read_response(resp_len)
    }

    /// Send `input` through the controller and return what comes back.
    pub fn echo(&self, input: u32) -> Result<u32> {
        let resp = self.call(MRPC_ECHO, &input.to_le_bytes(), 4)?;
        Ok(u32::from_le_bytes([resp[0], resp[1], resp[2], resp[3]]))
    }

    /// Check the command path end to end: a healthy controller echoes the
    /// bitwise complement of its input.
    pub fn self_test(&self) -> Result<()> {
        for pattern in [0xAA55_AA55, 0x1234_5678, 0xFFFF_0000] {
            let received = self.echo(pattern)?;
            if received != !pattern {
                return Err(Error::EchoMismatch {
                    sent: pattern,
                    expected: !pattern,
                    received,
                });
            }
        }
        Ok(())
    }

    /// Reset the whole switch. The controller drops off the bus, so this
    /// returns as soon as the command is accepted.
    pub fn hard_reset(&self) -> Result<()> {
        warn!("Hard reset of {}", self.name);
        self.call(MRPC_RESET, &RESET_HARD.to_le_bytes(), 0)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Channel> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closed(&self) -> Error {
        Error::Closed {
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

/// A submitted command whose response has not been read yet.
pub struct PendingResponse<'a> {
    guard: MutexGuard<'a, Channel>,
    device: &'a Device,
    opcode: u32,
    consumed: bool,
}

impl PendingResponse<'_> {
    pub fn opcode(&self) -> u32 {
        self.opcode
    }

    /// Read the response, expecting exactly `resp_len` data bytes.
    pub fn read_response(mut self, resp_len: usize) -> Result<Vec<u8>> {
        self.consumed = true;
        let opcode = self.opcode;
        let transport = self.guard.as_mut().ok_or_else(|| self.device.closed())?;

        let mut buf = vec![0u8; MRPC_STATUS_LEN + resp_len];
        let actual = transport.read_response(&mut buf).map_err(channel_error)?;
        let short = Error::ShortResponse {
            opcode,
            expected: buf.len(),
            actual,
        };
        if actual < MRPC_STATUS_LEN {
            return Err(short);
        }

        // An error reply carries the return code and no data.
        let code = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if code != 0 {
            debug!(opcode, code, "MRPC error");
            return Err(Error::Mrpc { opcode, code });
        }
        if actual < buf.len() {
            return Err(short);
        }

        Ok(buf.split_off(MRPC_STATUS_LEN))
    }
}

impl Drop for PendingResponse<'_> {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        // Drain the response so the next command does not read it.
        if let Some(transport) = self.guard.as_mut() {
            warn!(opcode = self.opcode, "Discarding unread MRPC response");
            let mut scratch = [0u8; MRPC_STATUS_LEN + MRPC_MAX_DATA_LEN];
            let _ = transport.read_response(&mut scratch);
        }
    }
}

fn channel_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::ResourceBusy {
        Error::Busy
    } else {
        Error::Io { source: err }
    }
}
