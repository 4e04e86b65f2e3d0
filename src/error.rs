// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Failure of a button-triggered emission.
///
/// Nothing was typed and the slot is unchanged when one of these is returned.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// The slot file could not be read
    Loading,
    /// The advanced counter could not be written
    Saving,
    /// The stored slot has an unexpected length or layout
    Corrupted,
    /// The HMAC computation failed
    Crypto,
    /// The moving factor cannot be advanced any further
    CounterOverflow,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let to_write = match self {
            Error::Loading => "Failed to load slot from filesystem",
            Error::Saving => "Failed to save slot to filesystem",
            Error::Corrupted => "Stored slot is corrupted",
            Error::Crypto => "HMAC computation failed",
            Error::CounterOverflow => "Moving factor exhausted",
        };
        f.write_str(to_write)
    }
}
