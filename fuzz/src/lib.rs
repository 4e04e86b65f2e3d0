// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbitrary::Arbitrary;
use otp_app::backend::Keyboard;
use otp_app::Slot;

#[derive(Arbitrary, Debug)]
pub enum Event {
    /// Raw APDU, may not even parse
    Apdu(Vec<u8>),
    /// Button press on slot 2 if set, slot 1 otherwise
    Button(bool),
}

impl Event {
    pub fn slot(second: bool) -> Slot {
        match second {
            true => Slot::Two,
            false => Slot::One,
        }
    }
}

#[derive(Arbitrary, Debug)]
pub struct Input {
    pub events: Vec<Event>,
    pub serial: [u8; 4],
}

/// Keyboard keeping what was typed
#[derive(Debug, Default)]
pub struct Typed {
    pub keys: Vec<u8>,
}

impl Keyboard for Typed {
    fn type_bytes(&mut self, data: &[u8], _printable: bool) {
        self.keys.extend_from_slice(data);
    }

    fn press(&mut self, key: u8) {
        self.keys.push(key);
    }
}
