// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Management tool for Switchtec PCIe switches.
//!
//! Usage:
//!   switchtec --device /dev/switchtec0 status
//!   switchtec fw-info
//!   switchtec fw-update image.pmc
//!   switchtec evcntr 0 --counter 4 --count 8 --clear

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(args)
}
