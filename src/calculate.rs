// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::TryInto;

use crate::config::KEY_SIZE;

/// Marker byte prepended to the slot key before it is used for HMAC
const HOTP_KEY_MARKER: u8 = 0x01;

pub type HotpKey = [u8; KEY_SIZE + 2];

/// ASCII digits of an HOTP code
pub type Code = heapless::Vec<u8, 8>;

/// The HMAC key of an HOTP slot: marker, a reserved zero byte, then the 16-byte slot key.
pub fn hotp_key(secret_key: &[u8]) -> HotpKey {
    let mut key = [0u8; KEY_SIZE + 2];
    key[0] = HOTP_KEY_MARKER;
    let len = secret_key.len().min(KEY_SIZE);
    key[2..2 + len].copy_from_slice(&secret_key[..len]);
    key
}

pub fn challenge(moving_factor: u64) -> [u8; 8] {
    moving_factor.to_be_bytes()
}

/// RFC 4226 dynamic truncation: 31 bits at the offset given by the low nibble of the last byte
pub fn dynamic_truncation(digest: &[u8]) -> Option<u32> {
    let offset = usize::from(digest.last()? & 0xf);
    let truncated: [u8; 4] = digest.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(truncated) & 0x7fff_ffff)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Digits {
    Six = 6,
    Eight = 8,
}

impl Digits {
    fn modulus(self) -> u32 {
        match self {
            Digits::Six => 1_000_000,
            Digits::Eight => 100_000_000,
        }
    }
}

/// Reduce `truncated` to `digits` decimal digits, zero padded
pub fn format_code(truncated: u32, digits: Digits) -> Code {
    let mut value = truncated % digits.modulus();
    let mut ascii = [b'0'; 8];
    let ascii = &mut ascii[..digits as usize];
    for digit in ascii.iter_mut().rev() {
        *digit = b'0' + (value % 10) as u8;
        value /= 10;
    }
    // at most 8 bytes, cannot fail
    Code::from_slice(ascii).unwrap_or_default()
}
