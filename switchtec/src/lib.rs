// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Management library for Switchtec PCIe switches.
//!
//! All operations go through the switch controller's MRPC command
//! channel:
//! - [`Device`]: handle and synchronous/split command calls
//! - [`BackgroundTracker`]: completion polling for long-running commands
//! - [`Firmware`]: image download, activation, flash readback, partitions
//! - [`EventCounters`]: per-stack hardware event counters
//! - [`Device::status`]: per-port link status

pub mod background;
pub mod device;
pub mod error;
pub mod evcntr;
pub mod firmware;
pub mod link;
pub mod transport;

pub use background::{BackgroundPoll, BackgroundTracker};
pub use device::{Device, PendingResponse, PollConfig};
pub use error::{Error, ErrorKind, Result};
pub use evcntr::EventCounters;
pub use firmware::{image_info, ActivePartitions, Firmware, ImageInfo, Toggle};
pub use link::{HexLtssm, LtssmTable, PortStatus};
pub use transport::{CharDevTransport, Transport};

pub use switchtec_common as common;
pub use switchtec_common::{
    BackgroundStatus, CounterSetup, DownloadStatus, EventTypeMask, ImageFooter, ImageType,
};
