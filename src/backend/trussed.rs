// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use trussed::types::{Location, Message};
use trussed::{client, try_syscall};

use super::{Oath, Record, Storage};
use crate::calculate::dynamic_truncation;
use crate::{Error, Slot};

/// [`Storage`] and [`Oath`] on top of a Trussed client.
///
/// Slots are files in `location`.  HMAC keys are injected into volatile storage for the
/// duration of a single signature.
#[derive(Debug)]
pub struct TrussedBackend<T> {
    client: T,
    location: Location,
}

impl<T> TrussedBackend<T> {
    /// Use `client`, keeping slot files in `location`
    pub fn new(client: T, location: Location) -> Self {
        Self { client, location }
    }

    /// The wrapped client
    pub fn client_mut(&mut self) -> &mut T {
        &mut self.client
    }
}

impl<T: client::Client> Storage for TrussedBackend<T> {
    fn read(&mut self, slot: Slot) -> Result<Option<Record>, Error> {
        let exists = try_syscall!(self.client.entry_metadata(self.location, slot.path()))
            .map_err(|_err| {
                warn_now!("Failed to stat {:?}: {:?}", slot, _err);
                Error::Loading
            })?
            .metadata
            .is_some();
        if !exists {
            return Ok(None);
        }

        let data = try_syscall!(self.client.read_file(self.location, slot.path()))
            .map_err(|_err| {
                warn_now!("Failed to read {:?}: {:?}", slot, _err);
                Error::Loading
            })?
            .data;
        if data.is_empty() {
            return Ok(None);
        }
        Record::from_slice(&data).map(Some).map_err(|_| {
            error_now!("Stored {:?} too long: {}", slot, data.len());
            Error::Corrupted
        })
    }

    fn write(&mut self, slot: Slot, data: &[u8]) -> Result<(), Error> {
        let data = Message::from_slice(data).map_err(|_| Error::Saving)?;
        try_syscall!(self
            .client
            .write_file(self.location, slot.path(), data, None))
        .map_err(|_err| {
            warn_now!("Failed to write {:?}: {:?}", slot, _err);
            Error::Saving
        })?;
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<(), Error> {
        try_syscall!(self.client.remove_file(self.location, slot.path())).map_err(|_err| {
            warn_now!("Failed to remove {:?}: {:?}", slot, _err);
            Error::Saving
        })?;
        Ok(())
    }
}

impl<T: client::Client + client::HmacSha1> Oath for TrussedBackend<T> {
    fn hotp(&mut self, key: &[u8], challenge: &[u8]) -> Result<u32, Error> {
        let key = try_syscall!(self
            .client
            .unsafe_inject_shared_key(key, Location::Volatile))
        .map_err(|_err| {
            warn_now!("Failed to inject key: {:?}", _err);
            Error::Crypto
        })?
        .key;

        let signature =
            try_syscall!(self.client.sign_hmacsha1(key, challenge)).map(|reply| reply.signature);
        // Volatile, but do not keep it around until the next reboot
        try_syscall!(self.client.delete(key)).ok();

        let signature = signature.map_err(|_err| {
            warn_now!("HMAC-SHA1 failed: {:?}", _err);
            Error::Crypto
        })?;
        dynamic_truncation(&signature).ok_or(Error::Crypto)
    }
}
