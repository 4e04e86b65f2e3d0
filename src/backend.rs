// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform functionality the app relies on.
//!
//! The app only handles the slot logic.  Persistence and HMAC come from a [`Storage`] and an
//! [`Oath`] implementation ([`TrussedBackend`] provides both), typing goes to a [`Keyboard`]
//! provided by the runner.

mod trussed;

pub use self::trussed::TrussedBackend;

use crate::config::RECORD_MAX_SIZE;
use crate::{Error, Slot};

/// A stored slot: the base record, optionally followed by the extended moving factor
pub type Record = heapless::Vec<u8, RECORD_MAX_SIZE>;

/// Key-addressed persistence of slot records.
pub trait Storage {
    /// Read the slot, `None` if it holds no data
    fn read(&mut self, slot: Slot) -> Result<Option<Record>, Error>;

    /// Replace the slot content with `data`
    fn write(&mut self, slot: Slot, data: &[u8]) -> Result<(), Error>;

    /// Remove the slot content
    fn remove(&mut self, slot: Slot) -> Result<(), Error>;

    /// Whether the slot holds data
    fn has_data(&mut self, slot: Slot) -> bool {
        matches!(self.read(slot), Ok(Some(_)))
    }

    /// Signal that deferred flash maintenance may run now.  Must not block.
    fn flash_available(&mut self) {}
}

/// HMAC-SHA1 based one-time password primitive.
pub trait Oath {
    /// Compute HMAC-SHA1 of `challenge` under `key` and return the dynamically truncated,
    /// 31-bit code (RFC 4226, section 5.3)
    fn hotp(&mut self, key: &[u8], challenge: &[u8]) -> Result<u32, Error>;
}

/// Virtual keyboard the tickets are typed on.
pub trait Keyboard {
    /// Queue `data` for typing.
    ///
    /// `printable` is set for ASCII text (HOTP digits) and unset for raw payload bytes of a
    /// static ticket.
    fn type_bytes(&mut self, data: &[u8], printable: bool);

    /// Queue a single keystroke after the data
    fn press(&mut self, key: u8);
}
