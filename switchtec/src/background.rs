// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tracking of long-running commands executing on the controller.
//!
//! A command such as a firmware download returns before the controller has
//! finished with it. Its progress is read back by re-issuing the same
//! opcode with the status sub-command.

use std::thread;
use std::time::{Duration, Instant};

use switchtec_common::protocol::{bg_status_request, BG_STATUS_RESP_LEN, MRPC_FWDNLD};
use switchtec_common::BackgroundStatus;
use tracing::trace;

use crate::device::{Device, PollConfig};
use crate::error::{Error, Result};

/// One status reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundPoll {
    pub status: BackgroundStatus,
    /// Command-specific state byte (the download status for downloads).
    pub detail: u8,
}

/// Polls the background state of one command family.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundTracker<'a> {
    dev: &'a Device,
    opcode: u32,
}

impl<'a> BackgroundTracker<'a> {
    pub fn new(dev: &'a Device, opcode: u32) -> Self {
        Self { dev, opcode }
    }

    pub fn firmware_download(dev: &'a Device) -> Self {
        Self::new(dev, MRPC_FWDNLD)
    }

    /// Query once without waiting.
    pub fn poll_once(&self) -> Result<BackgroundPoll> {
        let resp = self.dev.call(self.opcode, &bg_status_request(), BG_STATUS_RESP_LEN)?;
        let poll = BackgroundPoll {
            detail: resp[0],
            status: BackgroundStatus::from_code(resp[1]),
        };
        trace!(opcode = self.opcode, ?poll, "background status");
        Ok(poll)
    }

    /// Poll until the command is done or has failed.
    ///
    /// A busy controller counts as still in progress. After `timeout` a
    /// `Timeout` error is returned and the command is left running.
    pub fn wait(&self, interval: Duration, timeout: Duration) -> Result<BackgroundPoll> {
        self.wait_until(PollConfig { interval, timeout }, |poll| {
            Ok(poll.status.is_finished())
        })
    }

    /// Poll until `done` accepts a reading or returns an error.
    pub fn wait_until<F>(&self, cfg: PollConfig, mut done: F) -> Result<BackgroundPoll>
    where
        F: FnMut(&BackgroundPoll) -> Result<bool>,
    {
        let deadline = Instant::now() + cfg.timeout;

        loop {
            match self.poll_once() {
                Ok(poll) => {
                    if done(&poll)? {
                        return Ok(poll);
                    }
                }
                Err(err) if err.is_retryable() => {}
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout {
                    after: cfg.timeout,
                    last: None,
                });
            }
            thread::sleep(cfg.interval.min(deadline - now));
        }
    }
}
