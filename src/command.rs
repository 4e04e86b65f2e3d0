// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::{TryFrom, TryInto};

use iso7816::{Instruction, Status};

use crate::config::{SlotConfig, ACC_CODE_SIZE, CONFIG_SIZE};
use crate::oath::{self, OtpCommand};
use crate::Slot;

/// Decoded command request, along with data
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command<'l> {
    /// Select the application
    Select(Select<'l>),
    /// Write, overwrite or delete a slot configuration
    Configure(Configure<'l>),
    /// Return the device identifier
    DeviceId,
    /// Any other OTP sub-command: answered with the status
    Status,
}

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Select<'l> {
    pub aid: &'l [u8],
}

impl core::fmt::Debug for Select<'_> {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        fmt.debug_struct("Select")
            .field("aid", &hex_str!(&self.aid, 7))
            .finish()
    }
}

impl<'l> TryFrom<&'l [u8]> for Select<'l> {
    type Error = Status;
    /// Matches on the common prefix, so a truncated or extended AID still selects
    fn try_from(aid: &'l [u8]) -> Result<Self, Self::Error> {
        let len = aid.len().min(crate::YUBICO_OTP_AID.len());
        match aid[..len] == crate::YUBICO_OTP_AID[..len] {
            true => Ok(Self { aid }),
            false => Err(Status::NotFound),
        }
    }
}

/// Configuration payload: the record, followed by the access code of the slot as it is now
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Configure<'l> {
    pub slot: Slot,
    pub config: SlotConfig<'l>,
    pub access_code: &'l [u8; ACC_CODE_SIZE],
}

impl core::fmt::Debug for Configure<'_> {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        fmt.debug_struct("Configure")
            .field("slot", &self.slot)
            .field("config", &self.config)
            .field("delete", &self.config.is_delete_request())
            .finish()
    }
}

impl<'l> Configure<'l> {
    fn try_from(slot: Slot, data: &'l [u8]) -> Result<Self, Status> {
        // Reserved bytes are checked here, before the access code is compared
        let config = SlotConfig::decode(data)?;
        let access_code = data
            .get(CONFIG_SIZE..CONFIG_SIZE + ACC_CODE_SIZE)
            .and_then(|code| code.try_into().ok())
            .ok_or(Status::WrongLength)?;
        Ok(Self {
            slot,
            config,
            access_code,
        })
    }
}

impl<'l> Command<'l> {
    /// Parse the OTP instruction; P1 selects the sub-command
    fn try_parse_otp(p1: u8, p2: u8, data: &'l [u8]) -> Result<Self, Status> {
        if p2 != 0x00 {
            return Err(Status::IncorrectP1OrP2Parameter);
        }
        Ok(match OtpCommand::try_from(p1) {
            Ok(OtpCommand::ConfigureSlot1) => {
                Self::Configure(Configure::try_from(Slot::One, data)?)
            }
            Ok(OtpCommand::ConfigureSlot2) => {
                Self::Configure(Configure::try_from(Slot::Two, data)?)
            }
            Ok(OtpCommand::DeviceId) => Self::DeviceId,
            Err(_) => {
                debug_now!("Unhandled OTP sub-command {:#04x}", p1);
                Self::Status
            }
        })
    }
}

impl<'l, const C: usize> TryFrom<&'l iso7816::Command<C>> for Command<'l> {
    type Error = Status;
    /// The first layer of unraveling the iso7816::Command onion.
    ///
    /// Checks (cla, ins, p1, p2) and returns early errors; the payload is interpreted by the
    /// individual request types.
    fn try_from(command: &'l iso7816::Command<C>) -> Result<Self, Self::Error> {
        let (class, instruction, p1, p2) = (
            command.class(),
            command.instruction(),
            command.p1,
            command.p2,
        );
        let data = command.data();

        if class.into_inner() != 0x00 {
            return Err(Status::ClassNotSupported);
        }

        if (Instruction::Select, 0x04, 0x00) == (instruction, p1, p2) {
            return Ok(Self::Select(Select::try_from(data.as_slice())?));
        }

        let instruction_byte: u8 = instruction.into();
        match oath::Instruction::try_from(instruction_byte)? {
            oath::Instruction::Otp => Self::try_parse_otp(p1, p2, data),
        }
    }
}
