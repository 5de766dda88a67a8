// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use switchtec::{Device, ImageType, PollConfig};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "switchtec")]
#[command(about = "Management tool for Switchtec PCIe switches", version)]
pub struct Cli {
    /// Switch character device
    #[arg(short, long, default_value = "/dev/switchtec0")]
    pub device: PathBuf,

    /// Pause between status polls of long-running commands
    #[arg(long, value_name = "MS", default_value_t = 5)]
    pub poll_interval_ms: u64,

    /// Give up on a long-running command after this long
    #[arg(long, value_name = "MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the link status of every populated port
    Status,

    /// Send a value through the controller and print the reply
    Echo {
        #[arg(value_parser = parse_u32)]
        value: u32,
    },

    /// Check the command path with a series of echo round trips
    Test,

    /// Reset the whole switch
    HardReset {
        /// Confirm the reset; all links go down
        #[arg(long)]
        yes: bool,
    },

    /// Show active and inactive firmware and config partitions
    FwInfo {
        /// List every partition instead of the four dual-bank roles
        #[arg(long)]
        all: bool,
    },

    /// Download an update file and activate it
    FwUpdate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Leave the new image in the inactive bank
        #[arg(long)]
        dont_activate: bool,
    },

    /// Switch the active firmware and/or config bank
    FwToggle {
        #[arg(long)]
        firmware: bool,

        #[arg(long)]
        config: bool,
    },

    /// Read a flash range into a file
    FwRead {
        #[arg(value_parser = parse_u32)]
        addr: u32,

        #[arg(value_parser = parse_u32)]
        len: u32,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },

    /// Show and verify the header of an update file
    FwImgInfo {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Wrap a raw payload into an update file
    FwImgBuild {
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,

        /// Partition type the image is meant for
        #[arg(short, long = "type", value_enum)]
        image_type: PartitionArg,

        #[arg(long, value_parser = parse_u32, default_value = "0")]
        load_addr: u32,

        /// Packed version word: major<<24 | minor<<16 | build
        #[arg(long, value_parser = parse_u32)]
        version: u32,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },

    /// Program one event counter
    EvcntrSetup {
        stack: usize,
        counter: usize,

        /// Bitmask of stack ports to watch
        #[arg(long, value_parser = parse_u64)]
        ports: u64,

        /// Comma-separated event type names (see evcntr-types)
        #[arg(long)]
        types: String,

        /// Count egress instead of ingress events
        #[arg(long)]
        egress: bool,

        #[arg(long, default_value_t = 0)]
        threshold: u32,
    },

    /// Read event counters of one stack
    Evcntr {
        stack: usize,

        /// First counter to read
        #[arg(long, default_value_t = 0)]
        counter: usize,

        /// Number of counters (default: through the last one)
        #[arg(long)]
        count: Option<usize>,

        /// Zero the counters as they are read
        #[arg(long)]
        clear: bool,

        /// Also show each counter's configuration
        #[arg(long)]
        setup: bool,
    },

    /// List the event types a counter can watch
    EvcntrTypes,
}

/// Partition type names accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PartitionArg {
    Boot,
    Map0,
    Map1,
    Img0,
    Img1,
    Dat0,
    Dat1,
    Nvlog,
}

impl From<PartitionArg> for ImageType {
    fn from(arg: PartitionArg) -> Self {
        match arg {
            PartitionArg::Boot => ImageType::Boot,
            PartitionArg::Map0 => ImageType::Map0,
            PartitionArg::Map1 => ImageType::Map1,
            PartitionArg::Img0 => ImageType::Img0,
            PartitionArg::Img1 => ImageType::Img1,
            PartitionArg::Dat0 => ImageType::Dat0,
            PartitionArg::Dat1 => ImageType::Dat1,
            PartitionArg::Nvlog => ImageType::NvLog,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let poll = PollConfig {
        interval: Duration::from_millis(cli.poll_interval_ms),
        timeout: Duration::from_millis(cli.timeout_ms),
    };
    let path = cli.device;
    let open = || -> Result<Device> {
        let dev = Device::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(dev.with_poll_config(poll))
    };

    match cli.command {
        Commands::Status => commands::status(&open()?),
        Commands::Echo { value } => commands::echo(&open()?, value),
        Commands::Test => commands::test(&open()?),
        Commands::HardReset { yes } => commands::hard_reset(&open()?, yes),
        Commands::FwInfo { all } => commands::fw_info(&open()?, all),
        Commands::FwUpdate {
            file,
            dont_activate,
        } => commands::fw_update(&open()?, &file, dont_activate),
        Commands::FwToggle { firmware, config } => {
            commands::fw_toggle(&open()?, firmware, config)
        }
        Commands::FwRead { addr, len, out } => commands::fw_read(&open()?, addr, len, &out),
        Commands::FwImgInfo { file } => commands::fw_img_info(&file),
        Commands::FwImgBuild {
            payload,
            image_type,
            load_addr,
            version,
            out,
        } => commands::fw_img_build(&payload, image_type.into(), load_addr, version, &out),
        Commands::EvcntrSetup {
            stack,
            counter,
            ports,
            types,
            egress,
            threshold,
        } => commands::evcntr_setup(&open()?, stack, counter, ports, &types, egress, threshold),
        Commands::Evcntr {
            stack,
            counter,
            count,
            clear,
            setup,
        } => commands::evcntr(&open()?, stack, counter, count, clear, setup),
        Commands::EvcntrTypes => commands::evcntr_types(),
    }
}

/// Decimal or `0x`-prefixed hex.
fn parse_u32(s: &str) -> Result<u32, String> {
    parse_u64(s).and_then(|v| u32::try_from(v).map_err(|_| format!("{s} does not fit in 32 bits")))
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}
