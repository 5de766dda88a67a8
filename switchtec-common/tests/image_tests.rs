// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the partition footer and update-file header codec.

use switchtec_common::image::{
    parse_footer, version_string, write_header, ImageError, ImageFooter, ImageHeader, ImageType,
    FOOTER_LEN, FOOTER_MAGIC, HEADER_LEN,
};

const LOAD_ADDR: u32 = 0xA000_0000;
const VERSION: u32 = 0x0102_0003;

fn make_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

/// A partition region: payload, erased filler, then the footer.
fn make_region(payload: &[u8], filler: usize) -> Vec<u8> {
    let footer = ImageFooter::seal(payload, LOAD_ADDR, VERSION).unwrap();
    let mut region = payload.to_vec();
    region.extend(std::iter::repeat(0xFF).take(filler));
    region.extend_from_slice(&footer.to_bytes());
    region
}

// =============================================================================
// ImageFooter / parse_footer tests
// =============================================================================

#[test]
fn test_seal_uses_crc32_iso_hdlc() {
    let footer = ImageFooter::seal(b"123456789", 0, 0).unwrap();
    assert_eq!(footer.image_crc, 0xCBF4_3926);
    assert_eq!(footer.magic, FOOTER_MAGIC);
    assert_eq!(footer.image_len, 9);
}

#[test]
fn test_parse_footer_accepts_sealed_region() {
    let payload = make_payload(3000);
    let region = make_region(&payload, 500);

    let footer = parse_footer(&region).unwrap();
    assert_eq!(footer.image_len, 3000);
    assert_eq!(footer.load_addr, LOAD_ADDR);
    assert_eq!(footer.version, VERSION);
    assert_eq!(footer.version_string().as_str(), "1.02 B003");
}

#[test]
fn test_parse_footer_image_fills_region() {
    let payload = make_payload(64);
    let region = make_region(&payload, 0);
    assert!(parse_footer(&region).is_ok());
}

#[test]
fn test_parse_footer_payload_bit_flip_is_image_crc() {
    let payload = make_payload(300);
    let clean = make_region(&payload, 100);

    for pos in 0..payload.len() {
        let mut region = clean.clone();
        region[pos] ^= 0x01;
        match parse_footer(&region) {
            Err(ImageError::ImageCrc { .. }) => {}
            other => panic!("flip at {pos}: expected ImageCrc, got {other:?}"),
        }
    }
}

#[test]
fn test_parse_footer_filler_is_not_checksummed() {
    let payload = make_payload(200);
    let mut region = make_region(&payload, 50);
    region[220] = 0x00;
    assert!(parse_footer(&region).is_ok());
}

#[test]
fn test_parse_footer_descriptive_field_flip_is_header_crc() {
    let payload = make_payload(256);
    let clean = make_region(&payload, 64);
    let footer_at = clean.len() - FOOTER_LEN;

    // image_len, load_addr, version, reserved
    for field in [4, 8, 12, 16] {
        let mut region = clean.clone();
        region[footer_at + field] ^= 0x10;
        match parse_footer(&region) {
            Err(ImageError::HeaderCrc { .. }) => {}
            other => panic!("field at {field}: expected HeaderCrc, got {other:?}"),
        }
    }
}

#[test]
fn test_parse_footer_stored_crc_flip_is_header_crc() {
    let payload = make_payload(256);
    let mut region = make_region(&payload, 0);
    let footer_at = region.len() - FOOTER_LEN;
    region[footer_at + 20] ^= 0xFF;
    assert!(matches!(
        parse_footer(&region),
        Err(ImageError::HeaderCrc { .. })
    ));
}

#[test]
fn test_parse_footer_bad_magic() {
    let payload = make_payload(16);
    let mut region = make_region(&payload, 0);
    let footer_at = region.len() - FOOTER_LEN;
    region[footer_at] = b'X';
    assert_eq!(
        parse_footer(&region),
        Err(ImageError::BadMagic(*b"XMC\0"))
    );
}

#[test]
fn test_parse_footer_erased_partition_is_bad_magic() {
    let region = vec![0xFF; 4096];
    assert_eq!(
        parse_footer(&region),
        Err(ImageError::BadMagic([0xFF; 4]))
    );
}

#[test]
fn test_parse_footer_too_short() {
    assert_eq!(
        parse_footer(&[0u8; 10]),
        Err(ImageError::Truncated {
            need: FOOTER_LEN,
            got: 10
        })
    );
}

#[test]
fn test_parse_footer_declared_length_exceeds_region() {
    // A footer sealed over more data than the region holds before it.
    let payload = make_payload(512);
    let footer = ImageFooter::seal(&payload, LOAD_ADDR, VERSION).unwrap();
    let mut region = payload[..100].to_vec();
    region.extend_from_slice(&footer.to_bytes());

    assert_eq!(
        parse_footer(&region),
        Err(ImageError::LengthExceeded {
            declared: 512,
            available: 100
        })
    );
}

#[test]
fn test_footer_decode_ignores_payload() {
    let footer = ImageFooter::seal(&make_payload(10), LOAD_ADDR, VERSION).unwrap();
    let decoded = ImageFooter::decode(&footer.to_bytes()).unwrap();
    assert_eq!(decoded, footer);
}

#[test]
fn test_verify_payload_checks_only_image_len_bytes() {
    let payload = make_payload(100);
    let footer = ImageFooter::seal(&payload, 0, 0).unwrap();

    let mut data = payload.clone();
    data.extend_from_slice(&[0xAB; 32]);
    assert!(footer.verify_payload(&data).is_ok());
    assert!(matches!(
        footer.verify_payload(&data[..99]),
        Err(ImageError::LengthExceeded { .. })
    ));
}

// =============================================================================
// Update-file header tests
// =============================================================================

#[test]
fn test_header_round_trip() {
    let payload = make_payload(2048);
    let footer = ImageFooter::seal(&payload, LOAD_ADDR, VERSION).unwrap();
    let header = write_header(ImageType::Img1, &footer);
    assert_eq!(header.len(), HEADER_LEN);

    let parsed = ImageHeader::parse(&header).unwrap();
    assert_eq!(parsed.image_type, ImageType::Img1);
    assert_eq!(parsed.footer, footer);
    assert!(parsed.verify_payload(&payload).is_ok());
}

#[test]
fn test_header_type_word_is_not_crc_protected_but_validated() {
    let footer = ImageFooter::seal(&make_payload(8), LOAD_ADDR, VERSION).unwrap();
    let mut header = write_header(ImageType::Dat0, &footer);
    header[8] = 0x42;
    assert_eq!(
        ImageHeader::parse(&header),
        Err(ImageError::UnknownType(0x42))
    );
}

#[test]
fn test_header_version_flip_is_header_crc() {
    let footer = ImageFooter::seal(&make_payload(8), LOAD_ADDR, VERSION).unwrap();
    let mut header = write_header(ImageType::Img0, &footer);
    header[16] ^= 0x01;
    assert!(matches!(
        ImageHeader::parse(&header),
        Err(ImageError::HeaderCrc { .. })
    ));
}

#[test]
fn test_header_payload_flip_is_image_crc() {
    let mut payload = make_payload(300);
    let footer = ImageFooter::seal(&payload, LOAD_ADDR, VERSION).unwrap();
    let header = ImageHeader::parse(&write_header(ImageType::Img0, &footer)).unwrap();

    payload[150] ^= 0x80;
    assert!(matches!(
        header.verify_payload(&payload),
        Err(ImageError::ImageCrc { .. })
    ));
}

#[test]
fn test_header_truncated() {
    assert!(matches!(
        ImageHeader::parse(&[0u8; HEADER_LEN - 1]),
        Err(ImageError::Truncated { .. })
    ));
}

// =============================================================================
// Version and type naming tests
// =============================================================================

#[test]
fn test_version_string_format() {
    assert_eq!(version_string(0x0102_0003).as_str(), "1.02 B003");
    assert_eq!(version_string(0x1A0B_00FF).as_str(), "1a.0b B0FF");
    assert_eq!(version_string(0xFFFF_FFFF).as_str(), "ff.ff BFFFF");
    assert_eq!(version_string(0).as_str(), "0.00 B000");
}

#[test]
fn test_image_type_codes_round_trip() {
    for ty in ImageType::ALL {
        assert_eq!(ImageType::from_code(ty.code()), Ok(ty));
    }
    assert_eq!(ImageType::from_code(8), Err(ImageError::UnknownType(8)));
}

#[test]
fn test_image_type_names() {
    assert_eq!(ImageType::Boot.name(), "BOOT");
    assert_eq!(ImageType::Map0.name(), "MAP");
    assert_eq!(ImageType::Img1.name(), "IMG");
    assert_eq!(ImageType::Dat0.to_string(), "DAT");
    assert_eq!(ImageType::NvLog.name(), "NVLOG");
}

#[test]
fn test_image_type_banks() {
    assert!(ImageType::Img0.is_firmware_bank());
    assert!(ImageType::Img1.is_firmware_bank());
    assert!(ImageType::Dat1.is_config_bank());
    assert!(!ImageType::Map0.is_config_bank());

    assert_eq!(ImageType::Img0.alternate(), Some(ImageType::Img1));
    assert_eq!(ImageType::Dat1.alternate(), Some(ImageType::Dat0));
    assert_eq!(ImageType::Boot.alternate(), None);
}
