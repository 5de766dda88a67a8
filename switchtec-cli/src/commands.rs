// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for switch management operations.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use switchtec::common::image::{write_header, ImageFooter};
use switchtec::common::protocol::MAX_EVENT_COUNTERS;
use switchtec::common::EVENT_TYPES;
use switchtec::{image_info, CounterSetup, Device, EventTypeMask, ImageInfo, ImageType, Toggle};

fn progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn print_partition(label: &str, info: &ImageInfo) {
    println!(
        "  {:<18} {:<5} {:<12} @0x{:08x} ({:#x} bytes){}{}",
        label,
        info.image_type.name(),
        info.version.as_deref().unwrap_or("(no image)"),
        info.address,
        info.length,
        info.crc.map(|c| format!(" CRC 0x{:08x}", c)).unwrap_or_default(),
        if info.active { " [active]" } else { "" },
    );
}

/// Show the link status of every populated port.
pub fn status(dev: &Device) -> Result<()> {
    let ports = dev.status().context("Link status query failed")?;

    println!("{}: {} ports", dev.name(), ports.len());
    for p in &ports {
        println!();
        println!(
            "Partition {} {} Port {} (stack {}, port {})",
            p.partition,
            if p.upstream_port { "USP" } else { "DSP" },
            p.logical_port_id,
            p.stack,
            p.stack_port_id
        );
        println!("  Phys Port ID: {}", p.physical_port_id);
        println!(
            "  Status:       {}",
            if p.link_up { "UP" } else { "DOWN" }
        );
        println!("  LTSSM:        {}", p.ltssm_str);
        println!(
            "  Width:        x{} (configured x{})",
            p.negotiated_width, p.configured_width
        );
        if p.link_up {
            println!("  Rate:         Gen{}", p.link_rate);
        }
    }

    Ok(())
}

/// Send one value through the controller.
pub fn echo(dev: &Device, value: u32) -> Result<()> {
    let received = dev.echo(value)?;
    println!("Sent:     0x{:08x}", value);
    println!("Received: 0x{:08x}", received);
    Ok(())
}

/// Verify the command path end to end.
pub fn test(dev: &Device) -> Result<()> {
    dev.self_test()
        .with_context(|| format!("{}: self test failed", dev.name()))?;
    println!("{}: PASS", dev.name());
    Ok(())
}

/// Reset the switch.
pub fn hard_reset(dev: &Device, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "A hard reset takes every link on {} down; pass --yes to confirm",
            dev.name()
        );
    }
    dev.hard_reset()?;
    println!("{}: reset issued", dev.name());
    Ok(())
}

/// Show the partition layout.
pub fn fw_info(dev: &Device, all: bool) -> Result<()> {
    let fw = dev.firmware();

    let (status, bg) = fw.download_status()?;
    println!("Download status: {} (background {:?})", status, bg);
    println!();

    if all {
        println!("Partitions:");
        for info in fw.enumerate_partitions(ImageType::ALL.len())? {
            print_partition(&format!("{:?}", info.image_type), &info);
        }
        return Ok(());
    }

    let parts = fw.active_partition_info()?;
    println!("Firmware:");
    print_partition("Active", &parts.active_fw);
    print_partition("Inactive", &parts.inactive_fw);
    println!("Config:");
    print_partition("Active", &parts.active_cfg);
    print_partition("Inactive", &parts.inactive_cfg);

    Ok(())
}

/// Download an update file.
pub fn fw_update(dev: &Device, file: &Path, dont_activate: bool) -> Result<()> {
    let mut image =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    // Refuse files the controller would reject anyway.
    let info = image_info(&mut image)
        .with_context(|| format!("{} is not a valid update file", file.display()))?;
    image.seek(SeekFrom::Start(0))?;

    println!(
        "File:    {} ({} image, {}, {} bytes)",
        file.display(),
        info.image_type.name(),
        info.version.as_deref().unwrap_or("?"),
        info.length
    );
    println!("Device:  {}", dev.name());
    println!();

    let toggle = if dont_activate {
        Toggle::NONE
    } else if info.image_type.is_config_bank() {
        Toggle {
            firmware: false,
            config: true,
        }
    } else {
        Toggle::FIRMWARE
    };
    debug!(?info, ?toggle, "update file verified");

    let total = image.metadata()?.len();
    let pb = progress_bar(total)?;

    let result = dev
        .firmware()
        .write_image(&mut image, toggle, |done, _| pb.set_position(done));

    let status = match result {
        Ok(status) => status,
        Err(err) => {
            pb.abandon();
            return Err(err).context("Firmware download failed");
        }
    };
    pb.finish_with_message("Download complete");
    println!();

    println!("{}", status);
    if !status.is_activated() {
        println!(
            "Use 'switchtec --device {} fw-toggle' to activate the new image.",
            dev.name()
        );
    }
    Ok(())
}

/// Switch the active bank(s).
pub fn fw_toggle(dev: &Device, firmware: bool, config: bool) -> Result<()> {
    // No flag means the firmware bank, as fw-update does.
    let firmware = firmware || !config;

    let status = dev.firmware().toggle_active(firmware, config)?;
    println!("{}", status);

    let parts = dev.firmware().active_partition_info()?;
    print_partition("Active firmware", &parts.active_fw);
    print_partition("Active config", &parts.active_cfg);
    Ok(())
}

/// Dump a flash range into a file.
pub fn fw_read(dev: &Device, addr: u32, len: u32, out: &Path) -> Result<()> {
    let file =
        File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;
    let mut writer = BufWriter::new(file);

    let pb = progress_bar(len as u64)?;
    let result =
        dev.firmware()
            .read_image_to(&mut writer, addr, len as usize, |done, _| pb.set_position(done));
    if let Err(err) = result {
        pb.abandon();
        return Err(err).context("Flash read failed");
    }
    writer.flush()?;
    pb.finish_and_clear();

    println!(
        "Read {} bytes from 0x{:08x} into {}",
        len,
        addr,
        out.display()
    );
    Ok(())
}

/// Show and verify an update file.
pub fn fw_img_info(file: &Path) -> Result<()> {
    let mut f = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let info = image_info(&mut f)
        .with_context(|| format!("{} failed verification", file.display()))?;

    println!("File:      {}", file.display());
    println!("Type:      {} ({:?})", info.image_type.name(), info.image_type);
    println!("Version:   {}", info.version.as_deref().unwrap_or("?"));
    println!("Load addr: 0x{:08x}", info.address);
    println!("Length:    {} bytes", info.length);
    if let Some(crc) = info.crc {
        println!("CRC:       0x{:08x} (OK)", crc);
    }
    Ok(())
}

/// Build an update file from a raw payload.
pub fn fw_img_build(
    payload: &Path,
    image_type: ImageType,
    load_addr: u32,
    version: u32,
    out: &Path,
) -> Result<()> {
    let data =
        fs::read(payload).with_context(|| format!("Failed to read {}", payload.display()))?;
    if data.is_empty() {
        bail!("{} is empty", payload.display());
    }

    let footer = ImageFooter::seal(&data, load_addr, version)
        .with_context(|| format!("Failed to seal {}", payload.display()))?;
    let mut file = write_header(image_type, &footer).to_vec();
    file.extend_from_slice(&data);

    fs::write(out, &file).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Wrote {} ({} image {}, {} payload bytes, CRC 0x{:08x})",
        out.display(),
        image_type.name(),
        footer.version_string(),
        data.len(),
        footer.image_crc
    );
    Ok(())
}

/// Program one event counter.
pub fn evcntr_setup(
    dev: &Device,
    stack: usize,
    counter: usize,
    ports: u64,
    types: &str,
    egress: bool,
    threshold: u32,
) -> Result<()> {
    let Some(type_mask) = EventTypeMask::parse_list(types) else {
        bail!("Unknown event type in {:?}; see 'switchtec evcntr-types'", types);
    };
    if type_mask.is_empty() {
        bail!("No event types given");
    }

    let setup = CounterSetup {
        port_mask: ports,
        type_mask,
        egress,
        threshold,
    };
    dev.event_counters()
        .configure(stack, counter, &setup)
        .with_context(|| format!("Failed to set up counter {} on stack {}", counter, stack))?;

    println!("Stack {} counter {} set up", stack, counter);
    Ok(())
}

/// Read a range of counters.
pub fn evcntr(
    dev: &Device,
    stack: usize,
    first: usize,
    count: Option<usize>,
    clear: bool,
    setup: bool,
) -> Result<()> {
    let count = count.unwrap_or_else(|| MAX_EVENT_COUNTERS.saturating_sub(first));
    let counters = dev.event_counters();

    if !setup {
        let counts = counters.read(stack, first, count, clear)?;
        for (i, c) in counts.iter().enumerate() {
            println!("Stack {} counter {:2}: {}", stack, first + i, c);
        }
        return Ok(());
    }

    for (i, (s, c)) in counters
        .read_with_setup(stack, first, count, clear)?
        .into_iter()
        .enumerate()
    {
        if s.type_mask.is_empty() {
            continue;
        }
        let names: Vec<_> = s.type_mask.type_names().collect();
        println!(
            "Stack {} counter {:2}: {:>10}  ports 0x{:012x} {} {}{}",
            stack,
            first + i,
            c,
            s.port_mask,
            if s.egress { "egress" } else { "ingress" },
            names.join(","),
            if s.threshold > 0 {
                format!(" (threshold {})", s.threshold)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

/// List countable event types.
pub fn evcntr_types() -> Result<()> {
    for ty in &EVENT_TYPES {
        println!("  {:<20} {}", ty.name, ty.help);
    }
    println!();
    println!("Unions: ALL_ERRORS, ALL_TLPS, ALL");
    Ok(())
}
