// Copyright (C) 2021-2022 The Trussed Developers
// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bitflags::bitflags;
use iso7816::Status;

use crate::backend::{Record, Storage};
use crate::config::{SlotConfig, ACC_CODE_SIZE};
use crate::{Error, Slot};

bitflags! {
    /// Touch level byte of the status response
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct ConfigStatus: u8 {
        /// Slot 1 holds a configuration
        const CONFIG1_VALID = 0x01;
        /// Slot 2 holds a configuration
        const CONFIG2_VALID = 0x02;
        /// Slot 1 is triggered by touch
        const CONFIG1_TOUCH = 0x04;
        /// Slot 2 is triggered by touch
        const CONFIG2_TOUCH = 0x08;
        /// LED idle state is inverted
        const CONFIG_LED_INV = 0x10;
    }
}

impl ConfigStatus {
    fn valid(slot: Slot) -> Self {
        match slot {
            Slot::One => Self::CONFIG1_VALID,
            Slot::Two => Self::CONFIG2_VALID,
        }
    }
}

/// The 6-byte status returned after select and configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusReport {
    /// Firmware major version
    pub version_major: u8,
    /// Firmware minor version
    pub version_minor: u8,
    /// Configuration sequence number
    pub config_seq: u8,
    /// Touch level: touch capability and which slots are configured
    pub touch_level: ConfigStatus,
}

impl StatusReport {
    /// Wire representation
    pub fn to_bytes(&self) -> [u8; 6] {
        [
            self.version_major,
            self.version_minor,
            0,
            self.config_seq,
            self.touch_level.bits(),
            0,
        ]
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct State {
    pub runtime: Runtime,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Runtime {
    /// Bumped on every configuration change, so a host can tell its write went through.
    /// Re-derived from the stored slots on every select.
    pub config_seq: u8,
}

impl Runtime {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl State {
    pub fn new() -> Self {
        Default::default()
    }

    /// Applet got selected: 1 if any slot holds data, 0 otherwise
    pub fn select<S: Storage>(&mut self, storage: &mut S) {
        self.runtime.config_seq = u8::from(Self::has_any_configured(storage));
        debug_now!("Selected, config_seq {}", self.runtime.config_seq);
    }

    pub fn get<S: Storage>(storage: &mut S, slot: Slot) -> Result<Option<Record>, Error> {
        storage.read(slot)
    }

    pub fn has_any_configured<S: Storage>(storage: &mut S) -> bool {
        Slot::ALL.iter().any(|slot| storage.has_data(*slot))
    }

    /// Write, overwrite or delete the configuration of `slot`.
    ///
    /// `config` has already passed [`SlotConfig::decode`].  If the slot holds a record, its
    /// access code must equal `access_code`.  An all-zero record deletes the slot.
    pub fn configure<S: Storage>(
        &mut self,
        storage: &mut S,
        slot: Slot,
        config: SlotConfig<'_>,
        access_code: &[u8; ACC_CODE_SIZE],
    ) -> crate::Result {
        let stored = Self::get(storage, slot).map_err(|_err| {
            warn_now!("Failed to load {:?}: {:?}", slot, _err);
            Status::UnspecifiedPersistentExecutionError
        })?;
        if let Some(stored) = stored {
            let stored =
                SlotConfig::decode(&stored).map_err(|_| Status::UnspecifiedPersistentExecutionError)?;
            if stored.access_code() != access_code {
                info_now!("Access code mismatch for {:?}", slot);
                return Err(Status::SecurityStatusNotSatisfied);
            }
        }

        if config.is_delete_request() {
            return self.delete(storage, slot);
        }

        // The extended counter, if any, is dropped: a new configuration starts from its uid seed
        storage.write(slot, config.as_bytes()).map_err(|_| Status::NotEnoughMemory)?;
        storage.flash_available();
        self.runtime.config_seq = self.runtime.config_seq.wrapping_add(1);
        info_now!("Configured {:?}, config_seq {}", slot, self.runtime.config_seq);
        Ok(())
    }

    fn delete<S: Storage>(&mut self, storage: &mut S, slot: Slot) -> crate::Result {
        if storage.has_data(slot) {
            storage.remove(slot).map_err(|_| Status::NotEnoughMemory)?;
            storage.flash_available();
        }
        if Self::has_any_configured(storage) {
            self.runtime.config_seq = self.runtime.config_seq.wrapping_add(1);
        } else {
            self.runtime.config_seq = 0;
        }
        info_now!("Deleted {:?}, config_seq {}", slot, self.runtime.config_seq);
        Ok(())
    }

    pub fn status<S: Storage>(&self, storage: &mut S, version: crate::Version) -> StatusReport {
        let mut touch_level = ConfigStatus::CONFIG1_TOUCH | ConfigStatus::CONFIG2_TOUCH;
        for slot in Slot::ALL {
            if storage.has_data(slot) {
                touch_level |= ConfigStatus::valid(slot);
            }
        }
        StatusReport {
            version_major: version.major,
            version_minor: version.minor,
            config_seq: self.runtime.config_seq,
            touch_level,
        }
    }
}
