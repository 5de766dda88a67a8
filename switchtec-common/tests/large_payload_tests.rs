// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Payloads past the 32-bit image length.
//!
//! Kept apart from the codec tests since it maps a 4 GiB buffer. The buffer
//! is zero-initialized, so its pages are never touched.

#![cfg(target_pointer_width = "64")]

use switchtec_common::image::{ImageError, ImageFooter};

#[test]
fn test_seal_rejects_payload_past_u32() {
    let len = u32::MAX as usize + 1;
    let payload = vec![0u8; len];

    let err = ImageFooter::seal(&payload, 0, 0).unwrap_err();
    assert_eq!(err, ImageError::TooLarge(len));
}
