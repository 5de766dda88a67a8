// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware image footer and update-file header codec.
//!
//! Every flash partition ends with a 28-byte footer describing the image it
//! holds. Update files carry the same information in a 64-byte header that
//! also names the partition type. Both carry two independent CRC-32s:
//! one over the descriptive fields, one over the payload.

use core::fmt::{self, Write as _};

use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::le_u32;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub const FOOTER_MAGIC: [u8; 4] = *b"PMC\0";

/// magic[4], image_len, load_addr, version, rsvd, header_crc, image_crc
pub const FOOTER_LEN: usize = 28;

/// Footer bytes covered by `header_crc`.
const FOOTER_CRC_SPAN: usize = 20;

/// magic[4], image_len, type, load_addr, version, rsvd[9], header_crc, image_crc
pub const HEADER_LEN: usize = 64;

/// Version strings never exceed this many bytes.
pub const VERSION_STR_LEN: usize = 32;

pub type VersionString = heapless::String<VERSION_STR_LEN>;

/// Partition types stored in switch flash.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Boot = 0x0,
    Map0 = 0x1,
    Map1 = 0x2,
    Img0 = 0x3,
    Dat0 = 0x4,
    Dat1 = 0x5,
    NvLog = 0x6,
    Img1 = 0x7,
}

impl ImageType {
    /// All partition types in code order.
    pub const ALL: [ImageType; 8] = [
        Self::Boot,
        Self::Map0,
        Self::Map1,
        Self::Img0,
        Self::Dat0,
        Self::Dat1,
        Self::NvLog,
        Self::Img1,
    ];

    pub fn from_code(code: u32) -> Result<Self, ImageError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or(ImageError::UnknownType(code))
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Display name shared by both banks of a pair.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::Map0 | Self::Map1 => "MAP",
            Self::Img0 | Self::Img1 => "IMG",
            Self::Dat0 | Self::Dat1 => "DAT",
            Self::NvLog => "NVLOG",
        }
    }

    pub fn is_firmware_bank(self) -> bool {
        matches!(self, Self::Img0 | Self::Img1)
    }

    pub fn is_config_bank(self) -> bool {
        matches!(self, Self::Dat0 | Self::Dat1)
    }

    /// The other half of a dual-bank pair, if this type has one.
    pub fn alternate(self) -> Option<Self> {
        match self {
            Self::Map0 => Some(Self::Map1),
            Self::Map1 => Some(Self::Map0),
            Self::Img0 => Some(Self::Img1),
            Self::Img1 => Some(Self::Img0),
            Self::Dat0 => Some(Self::Dat1),
            Self::Dat1 => Some(Self::Dat0),
            Self::Boot | Self::NvLog => None,
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which image check failed, and on what values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image data truncated: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("bad image magic {0:02x?}, not a firmware image")]
    BadMagic([u8; 4]),
    #[error("header CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    HeaderCrc { stored: u32, computed: u32 },
    #[error("declared image length {declared} exceeds the {available} bytes available")]
    LengthExceeded { declared: u32, available: usize },
    #[error("image CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ImageCrc { stored: u32, computed: u32 },
    #[error("unknown image type {0:#x}")]
    UnknownType(u32),
    #[error("payload of {0} bytes does not fit a 32-bit image length")]
    TooLarge(usize),
}

/// Partition footer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFooter {
    pub magic: [u8; 4],
    pub image_len: u32,
    pub load_addr: u32,
    pub version: u32,
    pub reserved: u32,
    pub header_crc: u32,
    pub image_crc: u32,
}

impl ImageFooter {
    /// Build a footer for `payload` with both CRCs filled in.
    pub fn seal(payload: &[u8], load_addr: u32, version: u32) -> Result<Self, ImageError> {
        let image_len =
            u32::try_from(payload.len()).map_err(|_| ImageError::TooLarge(payload.len()))?;
        let mut ftr = Self {
            magic: FOOTER_MAGIC,
            image_len,
            load_addr,
            version,
            reserved: 0,
            header_crc: 0,
            image_crc: CRC32.checksum(payload),
        };
        ftr.header_crc = ftr.compute_header_crc();
        Ok(ftr)
    }

    /// Decode a footer block, checking magic and header CRC.
    ///
    /// The payload is not looked at; see [`ImageFooter::verify_payload`].
    pub fn decode(block: &[u8]) -> Result<Self, ImageError> {
        if block.len() < FOOTER_LEN {
            return Err(ImageError::Truncated {
                need: FOOTER_LEN,
                got: block.len(),
            });
        }

        let magic = [block[0], block[1], block[2], block[3]];
        if magic != FOOTER_MAGIC {
            return Err(ImageError::BadMagic(magic));
        }

        let ftr = Self {
            magic,
            image_len: le_u32(block, 4),
            load_addr: le_u32(block, 8),
            version: le_u32(block, 12),
            reserved: le_u32(block, 16),
            header_crc: le_u32(block, 20),
            image_crc: le_u32(block, 24),
        };

        let computed = CRC32.checksum(&block[..FOOTER_CRC_SPAN]);
        if computed != ftr.header_crc {
            return Err(ImageError::HeaderCrc {
                stored: ftr.header_crc,
                computed,
            });
        }

        Ok(ftr)
    }

    /// Check the declared length and image CRC against the partition data.
    ///
    /// `data` starts at the partition start; only the first `image_len`
    /// bytes are checksummed.
    pub fn verify_payload(&self, data: &[u8]) -> Result<(), ImageError> {
        let len = self.image_len as usize;
        if len > data.len() {
            return Err(ImageError::LengthExceeded {
                declared: self.image_len,
                available: data.len(),
            });
        }

        let computed = CRC32.checksum(&data[..len]);
        if computed != self.image_crc {
            return Err(ImageError::ImageCrc {
                stored: self.image_crc,
                computed,
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; FOOTER_LEN] {
        let mut buf = [0u8; FOOTER_LEN];
        buf[..FOOTER_CRC_SPAN].copy_from_slice(&self.crc_fields());
        buf[20..24].copy_from_slice(&self.header_crc.to_le_bytes());
        buf[24..28].copy_from_slice(&self.image_crc.to_le_bytes());
        buf
    }

    pub fn version_string(&self) -> VersionString {
        version_string(self.version)
    }

    fn crc_fields(&self) -> [u8; FOOTER_CRC_SPAN] {
        let mut buf = [0u8; FOOTER_CRC_SPAN];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.image_len.to_le_bytes());
        buf[8..12].copy_from_slice(&self.load_addr.to_le_bytes());
        buf[12..16].copy_from_slice(&self.version.to_le_bytes());
        buf[16..20].copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    fn compute_header_crc(&self) -> u32 {
        CRC32.checksum(&self.crc_fields())
    }
}

/// Parse and fully validate the footer at the end of a partition image.
///
/// `region` holds the partition contents from its first byte through the
/// footer. Checks run in order: magic, header CRC, declared length,
/// image CRC.
pub fn parse_footer(region: &[u8]) -> Result<ImageFooter, ImageError> {
    if region.len() < FOOTER_LEN {
        return Err(ImageError::Truncated {
            need: FOOTER_LEN,
            got: region.len(),
        });
    }

    let body_len = region.len() - FOOTER_LEN;
    let ftr = ImageFooter::decode(&region[body_len..])?;
    ftr.verify_payload(&region[..body_len])?;
    Ok(ftr)
}

/// Render a packed version word as `major.minor Bbuild`.
pub fn version_string(version: u32) -> VersionString {
    let major = version >> 24;
    let minor = (version >> 16) & 0xFF;
    let build = version & 0xFFFF;

    let mut s = VersionString::new();
    // Longest output is "ff.ff BFFFF", well inside the capacity.
    write!(s, "{:x}.{:02x} B{:03X}", major, minor, build).ok();
    s
}

/// Update-file header.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub image_type: ImageType,
    pub footer: ImageFooter,
}

impl ImageHeader {
    /// Decode and validate an update-file header.
    ///
    /// The header CRC is checked against the footer fields the header
    /// was built from, so a header carries the same guarantee as a footer.
    pub fn parse(buf: &[u8]) -> Result<Self, ImageError> {
        if buf.len() < HEADER_LEN {
            return Err(ImageError::Truncated {
                need: HEADER_LEN,
                got: buf.len(),
            });
        }

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != FOOTER_MAGIC {
            return Err(ImageError::BadMagic(magic));
        }

        let footer = ImageFooter {
            magic,
            image_len: le_u32(buf, 4),
            load_addr: le_u32(buf, 12),
            version: le_u32(buf, 16),
            reserved: le_u32(buf, 20),
            header_crc: le_u32(buf, 56),
            image_crc: le_u32(buf, 60),
        };

        let computed = footer.compute_header_crc();
        if computed != footer.header_crc {
            return Err(ImageError::HeaderCrc {
                stored: footer.header_crc,
                computed,
            });
        }

        let image_type = ImageType::from_code(le_u32(buf, 8))?;
        Ok(Self { image_type, footer })
    }

    /// Check the payload that follows the header in an update file.
    pub fn verify_payload(&self, payload: &[u8]) -> Result<(), ImageError> {
        self.footer.verify_payload(payload)
    }

    pub fn version_string(&self) -> VersionString {
        self.footer.version_string()
    }
}

/// Produce the update-file header for an image of the given type.
///
/// The footer's reserved word travels in the first reserved header slot
/// so [`ImageHeader::parse`] can re-derive the header CRC.
pub fn write_header(image_type: ImageType, footer: &ImageFooter) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[0..4].copy_from_slice(&footer.magic);
    buf[4..8].copy_from_slice(&footer.image_len.to_le_bytes());
    buf[8..12].copy_from_slice(&image_type.code().to_le_bytes());
    buf[12..16].copy_from_slice(&footer.load_addr.to_le_bytes());
    buf[16..20].copy_from_slice(&footer.version.to_le_bytes());
    buf[20..24].copy_from_slice(&footer.reserved.to_le_bytes());
    buf[56..60].copy_from_slice(&footer.header_crc.to_le_bytes());
    buf[60..64].copy_from_slice(&footer.image_crc.to_le_bytes());
    buf
}
