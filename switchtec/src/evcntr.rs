// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware event counters.
//!
//! Counters are addressed by (stack, slot). Reads are ranged: one command
//! returns a contiguous run of slots, and with `clear` set the controller
//! zeroes each counter in the same operation that reads it.

use switchtec_common::evcntr::{
    get_request, max_counters_per_read, record_len, setup_request, COUNT_RECORD_LEN,
    EVCNTR_GET, EVCNTR_GET_BOTH, EVCNTR_GET_SETUP, SETUP_RECORD_LEN,
};
use switchtec_common::protocol::{MAX_EVENT_COUNTERS, MAX_STACKS, MRPC_EVCNTR};
use switchtec_common::{CounterSetup, DecodeError, EventTypeMask};
use tracing::debug;

use crate::device::Device;
use crate::error::{Error, Result};

/// Event counter operations on one device.
#[derive(Debug, Clone, Copy)]
pub struct EventCounters<'a> {
    dev: &'a Device,
}

impl Device {
    pub fn event_counters(&self) -> EventCounters<'_> {
        EventCounters { dev: self }
    }
}

impl EventCounters<'_> {
    /// Program one counter slot.
    pub fn configure(&self, stack: usize, counter: usize, setup: &CounterSetup) -> Result<()> {
        check_stack(stack)?;
        check_counter(counter)?;
        if setup.port_mask & !CounterSetup::PORT_MASK_LIMIT != 0 {
            return Err(Error::InvalidRequest("port mask selects ports beyond the switch limit"));
        }
        if !EventTypeMask::all().contains(setup.type_mask) {
            return Err(Error::InvalidRequest("event type mask has undefined bits"));
        }

        debug!(stack, counter, ?setup, "event counter setup");
        self.dev
            .call(MRPC_EVCNTR, &setup_request(stack as u8, counter as u8, setup), 0)?;
        Ok(())
    }

    /// Configuration of `count` slots starting at `first`.
    pub fn get_setup(&self, stack: usize, first: usize, count: usize) -> Result<Vec<CounterSetup>> {
        self.ranged(EVCNTR_GET_SETUP, stack, first, count, false, CounterSetup::from_bytes)
    }

    /// Counts of `count` slots starting at `first`, optionally clearing them.
    pub fn read(&self, stack: usize, first: usize, count: usize, clear: bool) -> Result<Vec<u32>> {
        self.ranged(EVCNTR_GET, stack, first, count, clear, decode_count)
    }

    /// Configuration and count of each slot in the range.
    pub fn read_with_setup(
        &self,
        stack: usize,
        first: usize,
        count: usize,
        clear: bool,
    ) -> Result<Vec<(CounterSetup, u32)>> {
        self.ranged(EVCNTR_GET_BOTH, stack, first, count, clear, |rec| {
            let setup = CounterSetup::from_bytes(rec)?;
            let count = decode_count(&rec[SETUP_RECORD_LEN..])?;
            Ok((setup, count))
        })
    }

    /// Issue the fewest ranged reads whose responses fit the MRPC limit.
    fn ranged<T, D>(
        &self,
        sub_cmd: u8,
        stack: usize,
        first: usize,
        count: usize,
        clear: bool,
        decode: D,
    ) -> Result<Vec<T>>
    where
        D: Fn(&[u8]) -> std::result::Result<T, DecodeError>,
    {
        check_stack(stack)?;
        check_counter(first)?;
        if count == 0 {
            return Err(Error::InvalidRequest("counter count must be at least one"));
        }
        if count > MAX_EVENT_COUNTERS - first {
            return Err(Error::out_of_range(
                "last counter",
                (first as u64).saturating_add(count as u64 - 1),
                MAX_EVENT_COUNTERS,
            ));
        }

        let rec_len = record_len(sub_cmd).ok_or(Error::InvalidRequest("unknown counter read"))?;
        let per_read = max_counters_per_read(rec_len);
        let end = first + count;
        let mut out = Vec::with_capacity(count);

        let mut next = first;
        while next < end {
            let n = (end - next).min(per_read);
            let req = get_request(sub_cmd, stack as u8, next as u8, n as u8, clear);
            let resp = self.dev.call(MRPC_EVCNTR, &req, n * rec_len)?;

            for rec in resp.chunks_exact(rec_len) {
                let item = decode(rec).map_err(|source| Error::Malformed {
                    opcode: MRPC_EVCNTR,
                    source,
                })?;
                out.push(item);
            }
            next += n;
        }
        Ok(out)
    }
}

fn check_stack(stack: usize) -> Result<()> {
    if stack >= MAX_STACKS {
        return Err(Error::out_of_range("stack", stack as u64, MAX_STACKS));
    }
    Ok(())
}

fn check_counter(counter: usize) -> Result<()> {
    if counter >= MAX_EVENT_COUNTERS {
        return Err(Error::out_of_range("counter", counter as u64, MAX_EVENT_COUNTERS));
    }
    Ok(())
}

fn decode_count(rec: &[u8]) -> std::result::Result<u32, DecodeError> {
    if rec.len() < COUNT_RECORD_LEN {
        return Err(DecodeError::Truncated {
            need: COUNT_RECORD_LEN,
            got: rec.len(),
        });
    }
    Ok(u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]))
}
