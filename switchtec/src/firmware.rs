// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware download, flash readback and partition bookkeeping.
//!
//! The download protocol:
//! - Check no other download is in progress
//! - Send the image in blocks of at most `FWDNLD_MAX_BLOCK` bytes, waiting
//!   for the controller to finish each block before sending the next
//! - Poll until the controller reports the download complete
//! - Optionally toggle the active partition and poll until activated

use std::io::{self, Read, Seek, SeekFrom, Write};

use switchtec_common::image::{ImageFooter, ImageHeader, FOOTER_LEN, HEADER_LEN};
use switchtec_common::protocol::{
    rd_flash_request, toggle_request, DownloadBlockHeader, PartitionEntry, FWDNLD_MAX_BLOCK,
    MRPC_FWDNLD, MRPC_PART_INFO, MRPC_RD_FLASH, PART_INFO_RESP_LEN, RD_FLASH_MAX_CHUNK,
};
use switchtec_common::{BackgroundStatus, DownloadStatus, ImageError, ImageType};
use tracing::{debug, info, warn};

use crate::background::{BackgroundPoll, BackgroundTracker};
use crate::device::Device;
use crate::error::{Error, ErrorKind, Result};

/// Which banks to switch after a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toggle {
    pub firmware: bool,
    pub config: bool,
}

impl Toggle {
    pub const NONE: Self = Self {
        firmware: false,
        config: false,
    };
    pub const FIRMWARE: Self = Self {
        firmware: true,
        config: false,
    };
    pub const BOTH: Self = Self {
        firmware: true,
        config: true,
    };

    pub fn any(&self) -> bool {
        self.firmware || self.config
    }
}

/// A flash partition as seen through the partition table and its footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub image_type: ImageType,
    /// `None` when the partition holds no valid image.
    pub version: Option<String>,
    pub address: u32,
    pub length: u32,
    pub crc: Option<u32>,
    pub active: bool,
}

/// Active and standby banks for firmware and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePartitions {
    pub active_fw: ImageInfo,
    pub inactive_fw: ImageInfo,
    pub active_cfg: ImageInfo,
    pub inactive_cfg: ImageInfo,
}

/// Firmware operations on one device.
#[derive(Debug, Clone, Copy)]
pub struct Firmware<'a> {
    dev: &'a Device,
}

impl Device {
    pub fn firmware(&self) -> Firmware<'_> {
        Firmware { dev: self }
    }
}

impl<'a> Firmware<'a> {
    fn tracker(&self) -> BackgroundTracker<'a> {
        BackgroundTracker::firmware_download(self.dev)
    }

    /// Read the current download and background state once.
    pub fn download_status(&self) -> Result<(DownloadStatus, BackgroundStatus)> {
        let poll = self.tracker().poll_once()?;
        let status = download_status_of(&poll)?;
        Ok((status, poll.status))
    }

    /// Write an update image, optionally activating it.
    ///
    /// `progress` is called after each accepted block with
    /// (bytes sent, image length). Returns the terminal status reached.
    pub fn write_image<R, F>(
        &self,
        image: &mut R,
        activate: Toggle,
        mut progress: F,
    ) -> Result<DownloadStatus>
    where
        R: Read + Seek,
        F: FnMut(u64, u64),
    {
        let total = image.seek(SeekFrom::End(0))?;
        image.seek(SeekFrom::Start(0))?;

        if total == 0 {
            return Err(Error::InvalidRequest("firmware image is empty"));
        }
        let image_len = u32::try_from(total).map_err(|_| Error::OutOfRange {
            what: "image length",
            value: total,
            limit: u64::from(u32::MAX) + 1,
        })?;

        let (mut status, bg) = self.download_status()?;
        if status == DownloadStatus::InProgress || bg == BackgroundStatus::InProgress {
            return Err(Error::Busy);
        }

        info!("Downloading {} byte image to {}", total, self.dev.name());

        let mut block = vec![0u8; FWDNLD_MAX_BLOCK];
        let mut offset: u32 = 0;

        while offset < image_len {
            let len = fill_block(image, &mut block)?;
            if len == 0 {
                return Err(Error::Io {
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("image ended at {} of {} bytes", offset, image_len),
                    ),
                });
            }

            let hdr = DownloadBlockHeader {
                dont_activate: true,
                offset,
                image_len,
                block_len: len as u32,
            };
            let mut payload = hdr.to_bytes().to_vec();
            payload.extend_from_slice(&block[..len]);

            self.dev.call(MRPC_FWDNLD, &payload, 0)?;
            status = self.wait_block()?;

            offset += len as u32;
            debug!(offset, status = ?status, "block accepted");
            progress(offset as u64, total);
        }

        let status = self.wait_for(status, DownloadStatus::is_terminal_success)?;
        info!("Download finished: {}", status);

        if activate.any() && !status.is_activated() {
            return self.toggle_active(activate.firmware, activate.config);
        }
        Ok(status)
    }

    /// Switch the active firmware and/or config bank and wait for the
    /// controller to confirm activation.
    pub fn toggle_active(&self, toggle_fw: bool, toggle_cfg: bool) -> Result<DownloadStatus> {
        if !toggle_fw && !toggle_cfg {
            return Err(Error::InvalidRequest("nothing to toggle"));
        }

        info!(toggle_fw, toggle_cfg, "Toggling active partition");
        self.dev
            .call(MRPC_FWDNLD, &toggle_request(toggle_fw, toggle_cfg), 0)?;
        self.wait_for(DownloadStatus::InProgress, DownloadStatus::is_activated)
    }

    /// Read `len` bytes of flash starting at `addr`.
    ///
    /// The range is not checked against partition boundaries.
    pub fn read_image(&self, addr: u32, len: usize) -> Result<Vec<u8>> {
        flash_read_end(addr, len)?;
        let mut buf = Vec::with_capacity(len);
        self.read_image_to(&mut buf, addr, len, |_, _| {})?;
        Ok(buf)
    }

    /// Stream `len` bytes of flash starting at `addr` into `out`.
    pub fn read_image_to<W, F>(
        &self,
        out: &mut W,
        addr: u32,
        len: usize,
        mut progress: F,
    ) -> Result<()>
    where
        W: Write,
        F: FnMut(u64, u64),
    {
        let end = flash_read_end(addr, len)?;

        let mut cur = addr;
        while cur < end {
            let chunk = ((end - cur) as usize).min(RD_FLASH_MAX_CHUNK);
            let data = self
                .dev
                .call(MRPC_RD_FLASH, &rd_flash_request(cur, chunk as u32), chunk)?;
            out.write_all(&data)?;

            cur += chunk as u32;
            progress((cur - addr) as u64, len as u64);
        }
        Ok(())
    }

    /// Read and validate the footer at the end of a partition.
    ///
    /// Both the header CRC and the image CRC are checked; the error names
    /// whichever failed.
    pub fn read_footer(
        &self,
        partition_start: u32,
        partition_len: u32,
    ) -> Result<(ImageFooter, String)> {
        let len = partition_len as usize;
        if len < FOOTER_LEN {
            return Err(ImageError::Truncated {
                need: FOOTER_LEN,
                got: len,
            }
            .into());
        }

        let body_len = len - FOOTER_LEN;
        let footer_addr = partition_start.checked_add(body_len as u32).ok_or_else(|| {
            Error::out_of_range(
                "partition end",
                partition_start as u64 + partition_len as u64,
                u32::MAX as usize,
            )
        })?;

        let block = self.read_image(footer_addr, FOOTER_LEN)?;
        let footer = ImageFooter::decode(&block)?;

        if footer.image_len as usize > body_len {
            return Err(ImageError::LengthExceeded {
                declared: footer.image_len,
                available: body_len,
            }
            .into());
        }
        let payload = self.read_image(partition_start, footer.image_len as usize)?;
        footer.verify_payload(&payload)?;

        Ok((footer, footer.version_string().to_string()))
    }

    /// Partition info for the first `count` partition types, in type order.
    pub fn enumerate_partitions(&self, count: usize) -> Result<Vec<ImageInfo>> {
        if count == 0 || count > ImageType::ALL.len() {
            return Err(Error::out_of_range(
                "partition count",
                count as u64,
                ImageType::ALL.len() + 1,
            ));
        }
        self.partition_info(&ImageType::ALL[..count])
    }

    /// Partition-table data merged with each partition's footer.
    ///
    /// A partition without a valid footer is reported with no version
    /// and no CRC; channel and controller errors still fail the call.
    pub fn partition_info(&self, types: &[ImageType]) -> Result<Vec<ImageInfo>> {
        types.iter().map(|&t| self.one_partition(t)).collect()
    }

    /// The four dual-bank roles: active/inactive firmware and config.
    pub fn active_partition_info(&self) -> Result<ActivePartitions> {
        let mut all = self
            .partition_info(&[
                ImageType::Img0,
                ImageType::Img1,
                ImageType::Dat0,
                ImageType::Dat1,
            ])?
            .into_iter();

        let (Some(img0), Some(img1), Some(dat0), Some(dat1)) =
            (all.next(), all.next(), all.next(), all.next())
        else {
            return Err(Error::InvalidRequest("partition table incomplete"));
        };

        let (active_fw, inactive_fw) = if img0.active { (img0, img1) } else { (img1, img0) };
        let (active_cfg, inactive_cfg) = if dat0.active { (dat0, dat1) } else { (dat1, dat0) };

        Ok(ActivePartitions {
            active_fw,
            inactive_fw,
            active_cfg,
            inactive_cfg,
        })
    }

    fn one_partition(&self, image_type: ImageType) -> Result<ImageInfo> {
        let resp = self.dev.call(
            MRPC_PART_INFO,
            &PartitionEntry::request(image_type.code() as u8),
            PART_INFO_RESP_LEN,
        )?;
        let entry = PartitionEntry::from_bytes(&resp).map_err(|source| Error::Malformed {
            opcode: MRPC_PART_INFO,
            source,
        })?;

        let mut info = ImageInfo {
            image_type,
            version: None,
            address: entry.part_start,
            length: entry.part_len,
            crc: None,
            active: entry.active,
        };

        if !entry.valid {
            return Ok(info);
        }

        match self.read_footer(entry.part_start, entry.part_len) {
            Ok((footer, version)) => {
                info.version = Some(version);
                info.crc = Some(footer.image_crc);
            }
            Err(err) if err.kind() == ErrorKind::Format => {
                warn!("{:?} partition at {:#x}: {}", image_type, entry.part_start, err);
            }
            Err(err) => return Err(err),
        }
        Ok(info)
    }

    /// Wait for the block just sent to be processed.
    ///
    /// A terminal download status ends the wait even when the background
    /// state has already gone back to idle.
    fn wait_block(&self) -> Result<DownloadStatus> {
        let mut last = None;
        let poll = self
            .tracker()
            .wait_until(self.dev.poll_config(), |poll| {
                let status = download_status_of(poll)?;
                last = Some(status);
                check_download(status, poll)?;
                Ok(poll.status.is_finished() || status.is_terminal_success())
            })
            .map_err(|err| with_last_status(err, last))?;
        download_status_of(&poll)
    }

    /// Poll until `reached` accepts the download status.
    fn wait_for(
        &self,
        current: DownloadStatus,
        reached: fn(DownloadStatus) -> bool,
    ) -> Result<DownloadStatus> {
        if reached(current) {
            return Ok(current);
        }

        let mut last = Some(current);
        let poll = self
            .tracker()
            .wait_until(self.dev.poll_config(), |poll| {
                let status = download_status_of(poll)?;
                last = Some(status);
                check_download(status, poll)?;
                Ok(reached(status))
            })
            .map_err(|err| with_last_status(err, last))?;
        download_status_of(&poll)
    }
}

/// Read an update file's header and check its payload CRC.
pub fn image_info<R: Read>(file: &mut R) -> Result<ImageInfo> {
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let header = ImageHeader::parse(&data)?;
    header.verify_payload(&data[HEADER_LEN..])?;

    Ok(ImageInfo {
        image_type: header.image_type,
        version: Some(header.version_string().to_string()),
        address: header.footer.load_addr,
        length: header.footer.image_len,
        crc: Some(header.footer.image_crc),
        active: false,
    })
}

/// End address of a flash read, which must stay inside the 32-bit space.
fn flash_read_end(addr: u32, len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .and_then(|l| addr.checked_add(l))
        .ok_or(Error::OutOfRange {
            what: "flash read end",
            value: u64::from(addr).saturating_add(len as u64),
            limit: u64::from(u32::MAX) + 1,
        })
}

fn download_status_of(poll: &BackgroundPoll) -> Result<DownloadStatus> {
    DownloadStatus::from_code(poll.detail).map_err(|source| Error::Malformed {
        opcode: MRPC_FWDNLD,
        source,
    })
}

/// Fail on any status the controller will not recover from by itself.
fn check_download(status: DownloadStatus, poll: &BackgroundPoll) -> Result<()> {
    if status.is_mismatch() {
        return Err(Error::DownloadRejected(status));
    }
    if let BackgroundStatus::Failed(code) = poll.status {
        return Err(Error::Hardware { status, code });
    }
    if status == DownloadStatus::HardwareError {
        return Err(Error::Hardware {
            status,
            code: poll.status.code(),
        });
    }
    Ok(())
}

fn with_last_status(err: Error, last: Option<DownloadStatus>) -> Error {
    match err {
        Error::Timeout { after, .. } => Error::Timeout { after, last },
        other => other,
    }
}

/// Fill `block` from `image`, stopping early only at end of input.
fn fill_block<R: Read>(image: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match image.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
