// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Raw MRPC transport layer.
//!
//! A transport moves one framed command to the controller and one framed
//! response back. It knows nothing about opcodes; the command channel in
//! [`crate::device`] owns framing checks and serialization.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// Physical command path to a switch controller.
pub trait Transport: Send {
    /// Send `opcode` and `payload` as a single request.
    ///
    /// Fails with [`io::ErrorKind::ResourceBusy`] while the controller is
    /// still working on an earlier long-running command.
    fn submit(&mut self, opcode: u32, payload: &[u8]) -> io::Result<()>;

    /// Read the response to the last submitted request into `buf`.
    ///
    /// `buf` holds the 4-byte return code followed by the response data.
    /// Returns the number of bytes the controller produced.
    fn read_response(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn submit(&mut self, opcode: u32, payload: &[u8]) -> io::Result<()> {
        (**self).submit(opcode, payload)
    }

    fn read_response(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_response(buf)
    }
}

/// Transport over the Linux switchtec character device (`/dev/switchtecN`).
///
/// The driver takes one `write` of opcode + payload per command and
/// returns return code + response data on the following `read`.
pub struct CharDevTransport {
    file: File,
}

impl CharDevTransport {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl Transport for CharDevTransport {
    fn submit(&mut self, opcode: u32, payload: &[u8]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(4 + payload.len());
        buf.extend_from_slice(&opcode.to_le_bytes());
        buf.extend_from_slice(payload);

        // The driver rejects partial command writes, so this must be one call.
        let written = self.file.write(&buf)?;
        if written != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short command write: {} of {} bytes", written, buf.len()),
            ));
        }
        Ok(())
    }

    fn read_response(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
