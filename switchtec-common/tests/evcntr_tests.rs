// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for event counter masks and setup records.

use switchtec_common::evcntr::*;
use switchtec_common::protocol::MRPC_MAX_DATA_LEN;
use switchtec_common::DecodeError;

fn make_setup() -> CounterSetup {
    CounterSetup {
        port_mask: 0x0000_8000_0000_0005,
        type_mask: EventTypeMask::ECRC_ERR | EventTypeMask::POSTED_TLP,
        egress: true,
        threshold: 1000,
    }
}

// =============================================================================
// EventTypeMask tests
// =============================================================================

#[test]
fn test_event_type_catalogue_is_in_bit_order() {
    assert_eq!(EventTypeMask::type_count(), 23);
    for (bit, ty) in EVENT_TYPES.iter().enumerate() {
        assert_eq!(ty.mask.bits(), 1 << bit, "{}", ty.name);
    }
}

#[test]
fn test_all_is_union_of_every_type() {
    let union = EVENT_TYPES
        .iter()
        .fold(EventTypeMask::empty(), |acc, t| acc | t.mask);
    assert_eq!(union, EventTypeMask::ALL);
    assert_eq!(EventTypeMask::ALL, EventTypeMask::all());
}

#[test]
fn test_errors_and_tlps_partition_all_but_rule_hits() {
    let both = EventTypeMask::ALL_ERRORS | EventTypeMask::ALL_TLPS;
    assert!(EventTypeMask::ALL_ERRORS
        .intersection(EventTypeMask::ALL_TLPS)
        .is_empty());
    assert_eq!(EventTypeMask::ALL - both, EventTypeMask::RULE_TABLE_HIT);
    assert_eq!(EventTypeMask::ALL_TLPS.bits().count_ones(), 3);
}

#[test]
fn test_type_names() {
    let names: Vec<_> = make_setup().type_mask.type_names().collect();
    assert_eq!(names, ["ECRC_ERR", "POSTED_TLP"]);
}

#[test]
fn test_parse_list_single_and_unions() {
    assert_eq!(
        EventTypeMask::parse_list("ecrc_err, POSTED_TLP"),
        Some(make_setup().type_mask)
    );
    assert_eq!(
        EventTypeMask::parse_list("ALL_TLPS,NAK_RCVD"),
        Some(EventTypeMask::ALL_TLPS | EventTypeMask::NAK_RCVD)
    );
    assert_eq!(EventTypeMask::parse_list("all"), Some(EventTypeMask::ALL));
    assert_eq!(EventTypeMask::parse_list(""), Some(EventTypeMask::empty()));
}

#[test]
fn test_parse_list_unknown_name() {
    assert_eq!(EventTypeMask::parse_list("ECRC_ERR,BOGUS"), None);
}

// =============================================================================
// CounterSetup record tests
// =============================================================================

#[test]
fn test_setup_record_layout() {
    let bytes = make_setup().to_bytes();
    assert_eq!(bytes.len(), SETUP_RECORD_LEN);
    assert_eq!(&bytes[0..8], &0x0000_8000_0000_0005u64.to_le_bytes());
    // type mask in the low 24 bits, egress flag above it
    assert_eq!(&bytes[8..12], &[0x02, 0x00, 0x10, 0x01]);
    assert_eq!(&bytes[12..16], &1000u32.to_le_bytes());
}

#[test]
fn test_setup_record_decode() {
    let setup = make_setup();
    assert_eq!(CounterSetup::from_bytes(&setup.to_bytes()), Ok(setup));

    let ingress = CounterSetup {
        egress: false,
        ..setup
    };
    assert_eq!(CounterSetup::from_bytes(&ingress.to_bytes()), Ok(ingress));
}

#[test]
fn test_setup_record_rejects_ports_beyond_limit() {
    let mut bytes = make_setup().to_bytes();
    bytes[6] = 0x01; // port 48
    assert_eq!(
        CounterSetup::from_bytes(&bytes),
        Err(DecodeError::ReservedBits {
            what: "port mask",
            bits: 1 << 48
        })
    );
}

#[test]
fn test_setup_record_rejects_undefined_type_bit() {
    let mut bytes = make_setup().to_bytes();
    bytes[10] |= 0x80; // bit 23
    assert!(matches!(
        CounterSetup::from_bytes(&bytes),
        Err(DecodeError::ReservedBits {
            what: "event type mask",
            ..
        })
    ));
}

#[test]
fn test_setup_record_truncated() {
    assert!(matches!(
        CounterSetup::from_bytes(&[0u8; 12]),
        Err(DecodeError::Truncated { need: 16, got: 12 })
    ));
}

// =============================================================================
// Request encoder tests
// =============================================================================

#[test]
fn test_setup_request() {
    let req = setup_request(7, 63, &make_setup());
    assert_eq!(&req[..EVCNTR_HDR_LEN], &[EVCNTR_SETUP, 7, 63, 1]);
    assert_eq!(&req[EVCNTR_HDR_LEN..], &make_setup().to_bytes());
}

#[test]
fn test_get_request() {
    assert_eq!(
        get_request(EVCNTR_GET_BOTH, 2, 10, 20, true),
        [EVCNTR_GET_BOTH, 2, 10, 20, 1, 0, 0, 0]
    );
}

#[test]
fn test_records_per_read() {
    assert_eq!(record_len(EVCNTR_GET), Some(COUNT_RECORD_LEN));
    assert_eq!(record_len(EVCNTR_GET_SETUP), Some(SETUP_RECORD_LEN));
    assert_eq!(record_len(EVCNTR_GET_BOTH), Some(BOTH_RECORD_LEN));
    assert_eq!(record_len(EVCNTR_SETUP), None);

    assert_eq!(max_counters_per_read(COUNT_RECORD_LEN), 64);
    assert_eq!(max_counters_per_read(SETUP_RECORD_LEN), 64);
    assert_eq!(max_counters_per_read(BOTH_RECORD_LEN), 51);
    assert!(51 * BOTH_RECORD_LEN <= MRPC_MAX_DATA_LEN);
}
