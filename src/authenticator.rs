// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::TryInto;

use iso7816::{Data, Status};
use trussed::client;
use trussed::types::Location;

use crate::backend::{Keyboard, Oath, Storage, TrussedBackend};
use crate::command::{self, Command};
use crate::state::{State, StatusReport};
use crate::{credential, Error, Slot};

use crate::Result;

/// Firmware version reported in the status response
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Version {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch level, not part of the status response
    pub patch: u8,
}

impl Default for Version {
    /// The Yubikey 5 firmware line host tools know how to configure
    fn default() -> Self {
        Self {
            major: 5,
            minor: 2,
            patch: 7,
        }
    }
}

/// The options for the OTP app.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct Options {
    /// The storage location for the slot files (default: internal).
    pub location: Location,

    /// The version reported to the host
    pub version: Version,

    /// A serial number to be returned by the device id query
    pub serial_number: [u8; 4],
}

impl Options {
    pub const fn new(location: Location, version: Version, serial_number: [u8; 4]) -> Self {
        Self {
            location,
            version,
            serial_number,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Location::Internal, Version::default(), [0; 4])
    }
}

/// The OTP app.
///
/// Host commands come in through [`respond`](Self::respond), button presses through
/// [`button_pressed`](Self::button_pressed).  Both take `&mut self`, so a configuration write
/// and a counter update can never interleave.
#[derive(Debug)]
pub struct Authenticator<B, K> {
    options: Options,
    state: State,
    backend: B,
    keyboard: K,
}

impl<T, K> Authenticator<TrussedBackend<T>, K>
where
    T: client::Client + client::HmacSha1,
    K: Keyboard,
{
    /// Keep the slots in `options.location` of the Trussed `client`
    pub fn with_client(client: T, keyboard: K, options: Options) -> Self {
        Self::new(
            TrussedBackend::new(client, options.location),
            keyboard,
            options,
        )
    }
}

impl<B, K> Authenticator<B, K>
where
    B: Storage + Oath,
    K: Keyboard,
{
    pub fn new(backend: B, keyboard: K, options: Options) -> Self {
        Self {
            options,
            state: State::new(),
            backend,
            keyboard,
        }
    }

    pub fn respond<const C: usize, const R: usize>(
        &mut self,
        command: &iso7816::Command<C>,
        reply: &mut Data<R>,
    ) -> Result {
        // parse Iso7816Command
        let command: Command = command.try_into()?;
        info_now!("{:?}", &command);

        match command {
            Command::Select(select) => self.select(select, reply),
            Command::Configure(configure) => self.configure(configure, reply),
            Command::DeviceId => self.device_id(reply),
            Command::Status => self.status_response(reply),
        }
    }

    /// Type the output of `slot`, if any.
    ///
    /// On error nothing is typed and the slot is left as it was.
    pub fn button_pressed(&mut self, slot: Slot) -> core::result::Result<(), Error> {
        let ticket = credential::generate(&mut self.backend, slot).map_err(|err| {
            error_now!("Button press on {:?} failed: {:?}", slot, err);
            err
        })?;
        if let Some(ticket) = ticket {
            info_now!("Typing {} bytes from {:?}", ticket.data().len(), slot);
            ticket.type_on(&mut self.keyboard);
        }
        Ok(())
    }

    /// Current status, as sent after select and configuration
    pub fn status(&mut self) -> StatusReport {
        self.state.status(&mut self.backend, self.options.version)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn keyboard_mut(&mut self) -> &mut K {
        &mut self.keyboard
    }

    pub fn deselect(&mut self) {
        self.state.runtime.reset();
    }

    fn select<const R: usize>(
        &mut self,
        _select: command::Select<'_>,
        reply: &mut Data<R>,
    ) -> Result {
        self.state.select(&mut self.backend);
        self.status_response(reply)
    }

    fn configure<const R: usize>(
        &mut self,
        configure: command::Configure<'_>,
        reply: &mut Data<R>,
    ) -> Result {
        self.state.configure(
            &mut self.backend,
            configure.slot,
            configure.config,
            configure.access_code,
        )?;
        self.status_response(reply)
    }

    fn status_response<const R: usize>(&mut self, reply: &mut Data<R>) -> Result {
        let status = self.status();
        reply
            .extend_from_slice(&status.to_bytes())
            .map_err(|_| Status::UnspecifiedNonpersistentExecutionError)
    }

    fn device_id<const R: usize>(&self, reply: &mut Data<R>) -> Result {
        reply
            .extend_from_slice(&self.options.serial_number)
            .map_err(|_| Status::UnspecifiedNonpersistentExecutionError)
    }
}

impl<B, K> iso7816::App for Authenticator<B, K> {
    fn aid(&self) -> iso7816::Aid {
        iso7816::Aid::new(crate::YUBICO_OTP_AID)
    }
}

#[cfg(feature = "apdu-dispatch")]
impl<B, K, const C: usize, const R: usize> apdu_dispatch::app::App<C, R> for Authenticator<B, K>
where
    B: Storage + Oath,
    K: Keyboard,
{
    fn select(&mut self, apdu: &iso7816::Command<C>, reply: &mut Data<R>) -> Result {
        self.respond(apdu, reply)
    }

    fn deselect(&mut self) {
        Authenticator::deselect(self)
    }

    fn call(
        &mut self,
        _: iso7816::Interface,
        apdu: &iso7816::Command<C>,
        reply: &mut Data<R>,
    ) -> Result {
        self.respond(apdu, reply)
    }
}
