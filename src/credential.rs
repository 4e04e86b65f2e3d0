// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::backend::{Keyboard, Oath, Record, Storage};
use crate::calculate::{challenge, format_code, hotp_key, Digits};
use crate::config::{Counter, SlotConfig, TICKET_MAX_SIZE};
use crate::{Error, Slot};

/// Keystroke typed after an HOTP code with `APPEND_CR`
pub const HOTP_TERMINATOR: u8 = b'\r';
/// Keystroke typed after a static ticket with `APPEND_CR`
pub const STATIC_TERMINATOR: u8 = 0x28;

/// What a button press types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ticket {
    data: heapless::Vec<u8, TICKET_MAX_SIZE>,
    printable: bool,
    terminator: Option<u8>,
}

impl Ticket {
    /// The bytes to type
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// ASCII text rather than raw payload bytes
    pub fn is_printable(&self) -> bool {
        self.printable
    }

    /// Keystroke after the data, if any
    pub fn terminator(&self) -> Option<u8> {
        self.terminator
    }

    pub(crate) fn type_on<K: Keyboard>(&self, keyboard: &mut K) {
        keyboard.type_bytes(&self.data, self.printable);
        if let Some(key) = self.terminator {
            keyboard.press(key);
        }
    }

    fn new(data: &[u8], printable: bool, terminator: Option<u8>) -> Self {
        let mut ticket = Self {
            data: Default::default(),
            printable,
            terminator,
        };
        let len = data.len().min(TICKET_MAX_SIZE);
        // Cannot fail, bounded by the capacity
        ticket.data.extend_from_slice(&data[..len]).ok();
        ticket
    }
}

/// Produce the ticket of `slot`, advancing its moving factor if it is an HOTP slot.
///
/// `Ok(None)` if the slot is empty or its mode does not type anything.  On error nothing was
/// written back.
pub fn generate<B: Storage + Oath>(backend: &mut B, slot: Slot) -> Result<Option<Ticket>, Error> {
    let stored = match backend.read(slot)? {
        Some(stored) => stored,
        None => {
            debug_now!("{:?} is empty", slot);
            return Ok(None);
        }
    };
    let config = SlotConfig::decode(&stored).map_err(|_| Error::Corrupted)?;
    debug_now!("{:?}: {:?}", slot, config);

    if config.is_hotp() {
        hotp(backend, slot, config, Counter::load(&stored)?).map(Some)
    } else if config.short_ticket() || config.static_ticket_mode() {
        let mut len = usize::from(config.fixed_size());
        if config.short_ticket() {
            len /= 2;
        }
        let terminator = config.append_cr().then_some(STATIC_TERMINATOR);
        Ok(Some(Ticket::new(config.static_ticket(len), false, terminator)))
    } else {
        // Challenge-response slots are only used by the host
        info_now!("{:?} has no keyboard output", slot);
        Ok(None)
    }
}

fn hotp<B: Storage + Oath>(
    backend: &mut B,
    slot: Slot,
    config: SlotConfig<'_>,
    counter: Counter,
) -> Result<Ticket, Error> {
    let next = counter.next()?;
    let truncated = backend.hotp(
        &hotp_key(config.secret_key()),
        &challenge(counter.moving_factor()),
    )?;
    let digits = match config.hotp8() {
        true => Digits::Eight,
        false => Digits::Six,
    };
    let code = format_code(truncated, digits);

    // Persist before anything is typed, so a code is never typed twice
    let mut updated = Record::new();
    updated
        .extend_from_slice(config.as_bytes())
        .and_then(|_| updated.extend_from_slice(&next.to_bytes()))
        .map_err(|_| Error::Saving)?;
    backend.write(slot, &updated)?;
    backend.flash_available();
    debug_now!("{:?} moving factor now {}", slot, next.moving_factor());

    let terminator = config.append_cr().then_some(HOTP_TERMINATOR);
    Ok(Ticket::new(&code, true, terminator))
}
