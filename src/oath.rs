use core::convert::TryFrom;

use trussed::types::PathBuf;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    Otp = 0x01,
    // Declared by the applet family, not handled here
    // Delete = 0x02,
    // SetCode = 0x03,
    // Reset = 0x04,
}

impl TryFrom<u8> for Instruction {
    type Error = iso7816::Status;
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x01 => Instruction::Otp,
            _ => return Err(Self::Error::InstructionNotSupportedOrInvalid),
        })
    }
}

impl PartialEq<u8> for Instruction {
    fn eq(&self, other: &u8) -> bool {
        *self as u8 == *other
    }
}

/// Sub-operation of the OTP instruction, carried in P1
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OtpCommand {
    ConfigureSlot1 = 0x01,
    ConfigureSlot2 = 0x03,
    DeviceId = 0x10,
}

impl TryFrom<u8> for OtpCommand {
    type Error = iso7816::Status;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use OtpCommand::*;
        Ok(match value {
            0x01 => ConfigureSlot1,
            0x03 => ConfigureSlot2,
            0x10 => DeviceId,
            _ => return Err(Self::Error::IncorrectP1OrP2Parameter),
        })
    }
}

impl OtpCommand {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl PartialEq<u8> for OtpCommand {
    fn eq(&self, other: &u8) -> bool {
        *self as u8 == *other
    }
}

/// One of the two configuration slots.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Slot {
    /// First slot
    One = 1,
    /// Second slot
    Two = 2,
}

impl TryFrom<u8> for Slot {
    type Error = iso7816::Status;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Slot::One,
            2 => Slot::Two,
            _ => return Err(Self::Error::IncorrectP1OrP2Parameter),
        })
    }
}

impl Slot {
    /// Both slots, in status order
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    pub(crate) fn path(&self) -> PathBuf {
        match self {
            Slot::One => PathBuf::from("slot1.otp"),
            Slot::Two => PathBuf::from("slot2.otp"),
        }
    }
}
