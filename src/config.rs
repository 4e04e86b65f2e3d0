// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot configuration record, bit compatible with the Yubikey personalization format.
//!
//! ```text
//! offset  size  field
//!      0    16  fixed_data
//!     16     6  uid
//!     22    16  secret_key
//!     38     6  access_code
//!     44     1  fixed_size
//!     45     1  ext_flags
//!     46     1  tkt_flags
//!     47     1  cfg_flags
//!     48     2  reserved, must be zero
//!     50     2  checksum
//! ```
//!
//! A stored record may be followed by an 8-byte big-endian moving factor, see [`Counter`].

use core::convert::TryInto;
use core::ops::Range;

use bitflags::bitflags;
use iso7816::Status;

use crate::{ensure, Error};

/// Length of the static part
pub const FIXED_SIZE: usize = 16;
/// Length of the private identity
pub const UID_SIZE: usize = 6;
/// Length of the symmetric key
pub const KEY_SIZE: usize = 16;
/// Length of the access code
pub const ACC_CODE_SIZE: usize = 6;
/// Length of the extended moving factor appended to a stored record
pub const COUNTER_SIZE: usize = 8;
/// Length of the base record
pub const CONFIG_SIZE: usize = 52;
/// Longest blob a slot ever stores
pub const RECORD_MAX_SIZE: usize = CONFIG_SIZE + COUNTER_SIZE;
/// Longest static ticket: personalization tools spread it over fixed_data, uid and secret_key
pub const TICKET_MAX_SIZE: usize = FIXED_SIZE + UID_SIZE + KEY_SIZE;

const FIXED_DATA: Range<usize> = 0..16;
const UID: Range<usize> = 16..22;
const SECRET_KEY: Range<usize> = 22..38;
const ACCESS_CODE: Range<usize> = 38..44;
const FIXED_SIZE_OFFSET: usize = 44;
const EXT_FLAGS_OFFSET: usize = 45;
const TKT_FLAGS_OFFSET: usize = 46;
const CFG_FLAGS_OFFSET: usize = 47;
const RESERVED: Range<usize> = 48..50;
const CHECKSUM: Range<usize> = 50..52;

bitflags! {
    /// Extended flags
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct ExtFlags: u8 {
        /// Serial number visible at startup (button press)
        const SERIAL_BTN_VISIBLE = 0x01;
        /// Serial number visible in USB iSerial field
        const SERIAL_USB_VISIBLE = 0x02;
        /// Serial number visible via API call
        const SERIAL_API_VISIBLE = 0x04;
        /// Use numeric keypad for digits
        const USE_NUMERIC_KEYPAD = 0x08;
        /// Use fast trig if only cfg1 set
        const FAST_TRIG = 0x10;
        /// Allow update of existing configuration (selected flags + access code)
        const ALLOW_UPDATE = 0x20;
        /// Dormant config (woken up, flag removed, requires update flag)
        const DORMANT = 0x40;
        /// LED idle state is off rather than on
        const LED_INV = 0x80;
    }
}

bitflags! {
    /// Ticket flags, controlling how the output is typed
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct TktFlags: u8 {
        /// Send TAB before first part
        const TAB_FIRST = 0x01;
        /// Send TAB after first part
        const APPEND_TAB1 = 0x02;
        /// Send TAB after second part
        const APPEND_TAB2 = 0x04;
        /// Add 0.5s delay after first part
        const APPEND_DELAY1 = 0x08;
        /// Add 0.5s delay after second part
        const APPEND_DELAY2 = 0x10;
        /// Append CR as final character
        const APPEND_CR = 0x20;
        /// OATH HOTP mode
        const OATH_HOTP = 0x40;
        /// Challenge-response enabled (both must be set)
        const CHAL_RESP = 0x40;
        /// Block update of config 2 unless config 2 is configured and has this bit set
        const PROTECT_CFG2 = 0x80;
    }
}

bitflags! {
    /// Configuration flags; the meaning of some bits depends on the mode
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct CfgFlags: u8 {
        /// Send reference string (0..F) before data
        const SEND_REF = 0x01;
        /// Add 10ms intra-key pacing
        const PACING_10MS = 0x04;
        /// Add 20ms intra-key pacing
        const PACING_20MS = 0x08;
        /// Static ticket generation
        const STATIC_TICKET = 0x20;

        /// Static: send truncated ticket (half length)
        const SHORT_TICKET = 0x02;
        /// Static: strong password policy flag #1 (mixed case)
        const STRONG_PW1 = 0x10;
        /// Static: strong password policy flag #2 (substitute 0..7 to digits)
        const STRONG_PW2 = 0x40;
        /// Static: allow manual (local) update of static OTP
        const MAN_UPDATE = 0x80;

        /// Challenge: set when HMAC message is less than 64 bytes
        const HMAC_LT64 = 0x04;
        /// Challenge: operation requires button press
        const CHAL_BTN_TRIG = 0x08;
        /// Challenge: Yubico OTP mode
        const CHAL_YUBICO = 0x20;
        /// Challenge: HMAC-SHA1 mode
        const CHAL_HMAC = 0x22;

        /// OATH: generate 8 digits HOTP rather than 6 digits
        const OATH_HOTP8 = 0x02;
        /// OATH: first byte in fixed part sent as modhex
        const OATH_FIXED_MODHEX1 = 0x10;
        /// OATH: first two bytes in fixed part sent as modhex
        const OATH_FIXED_MODHEX2 = 0x40;
        /// OATH: fixed part sent as modhex
        const OATH_FIXED_MODHEX = 0x50;
    }
}

/// Read-only view of a slot configuration record.
///
/// The view borrows the first [`CONFIG_SIZE`] bytes of the buffer it was decoded from; anything
/// after that (the extended moving factor of a stored slot) is left to [`Counter`].
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct SlotConfig<'a> {
    raw: &'a [u8; CONFIG_SIZE],
}

impl core::fmt::Debug for SlotConfig<'_> {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        fmt.debug_struct("SlotConfig")
            .field("fixed_size", &self.fixed_size())
            .field("ext_flags", &self.ext_flags())
            .field("tkt_flags", &self.tkt_flags())
            .field("cfg_flags", &self.cfg_flags())
            .finish()
    }
}

impl<'a> SlotConfig<'a> {
    /// Decode the record at the start of `data`.
    ///
    /// Fails with `WrongLength` if `data` is shorter than [`CONFIG_SIZE`], and with
    /// `IncorrectDataParameter` if the reserved bytes are not zero.
    pub fn decode(data: &'a [u8]) -> Result<Self, Status> {
        let raw: &[u8; CONFIG_SIZE] = data
            .get(..CONFIG_SIZE)
            .and_then(|raw| raw.try_into().ok())
            .ok_or(Status::WrongLength)?;
        ensure(raw[RESERVED] == [0, 0], Status::IncorrectDataParameter)?;
        Ok(Self { raw })
    }

    /// The encoded base record
    pub fn as_bytes(&self) -> &'a [u8; CONFIG_SIZE] {
        self.raw
    }

    /// Static payload
    pub fn fixed_data(&self) -> &'a [u8] {
        &self.raw[FIXED_DATA]
    }

    /// Private identity
    pub fn uid(&self) -> &'a [u8] {
        &self.raw[UID]
    }

    /// Symmetric key used for HOTP and challenge-response
    pub fn secret_key(&self) -> &'a [u8] {
        &self.raw[SECRET_KEY]
    }

    /// Code required to overwrite this slot
    pub fn access_code(&self) -> &'a [u8] {
        &self.raw[ACCESS_CODE]
    }

    /// Number of valid bytes of the static payload
    pub fn fixed_size(&self) -> u8 {
        self.raw[FIXED_SIZE_OFFSET]
    }

    /// Extended flags
    pub fn ext_flags(&self) -> ExtFlags {
        ExtFlags::from_bits_retain(self.raw[EXT_FLAGS_OFFSET])
    }

    /// Ticket flags
    pub fn tkt_flags(&self) -> TktFlags {
        TktFlags::from_bits_retain(self.raw[TKT_FLAGS_OFFSET])
    }

    /// Configuration flags
    pub fn cfg_flags(&self) -> CfgFlags {
        CfgFlags::from_bits_retain(self.raw[CFG_FLAGS_OFFSET])
    }

    /// Checksum computed by the host, not verified
    pub fn checksum(&self) -> [u8; 2] {
        [self.raw[CHECKSUM.start], self.raw[CHECKSUM.start + 1]]
    }

    /// The first `len` bytes of the static payload.
    ///
    /// Lengths above 16 continue into `uid` and `secret_key`, where personalization tools put the
    /// tail of long static passwords.
    pub fn static_ticket(&self, len: usize) -> &'a [u8] {
        &self.raw[..len.min(TICKET_MAX_SIZE)]
    }

    /// An all-zero record requests deletion of the slot
    pub fn is_delete_request(&self) -> bool {
        self.raw.iter().all(|byte| *byte == 0)
    }

    /// The slot emits HOTP codes
    pub fn is_hotp(&self) -> bool {
        self.tkt_flags().contains(TktFlags::OATH_HOTP)
    }

    /// HOTP codes have 8 digits rather than 6
    pub fn hotp8(&self) -> bool {
        self.cfg_flags().contains(CfgFlags::OATH_HOTP8)
    }

    /// Static output is cut to half of `fixed_size`
    pub fn short_ticket(&self) -> bool {
        self.cfg_flags().contains(CfgFlags::SHORT_TICKET)
    }

    /// The slot emits a static ticket
    pub fn static_ticket_mode(&self) -> bool {
        self.cfg_flags().contains(CfgFlags::STATIC_TICKET)
    }

    /// A terminator is typed after the ticket
    pub fn append_cr(&self) -> bool {
        self.tkt_flags().contains(TktFlags::APPEND_CR)
    }

    /// Updating the slot keeps the access code
    pub fn allow_update(&self) -> bool {
        self.ext_flags().contains(ExtFlags::ALLOW_UPDATE)
    }

    /// Slot is dormant
    pub fn dormant(&self) -> bool {
        self.ext_flags().contains(ExtFlags::DORMANT)
    }

    /// LED idle state is inverted
    pub fn led_inverted(&self) -> bool {
        self.ext_flags().contains(ExtFlags::LED_INV)
    }

    /// Writing slot 2 is protected
    pub fn protect_cfg2(&self) -> bool {
        self.tkt_flags().contains(TktFlags::PROTECT_CFG2)
    }
}

/// Owned slot configuration, as sent by a personalization tool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfigRecord {
    /// Static payload
    pub fixed_data: [u8; FIXED_SIZE],
    /// Private identity
    pub uid: [u8; UID_SIZE],
    /// Symmetric key
    pub secret_key: [u8; KEY_SIZE],
    /// Code required for the next overwrite
    pub access_code: [u8; ACC_CODE_SIZE],
    /// Number of valid bytes of the static payload
    pub fixed_size: u8,
    /// Extended flags
    pub ext_flags: ExtFlags,
    /// Ticket flags
    pub tkt_flags: TktFlags,
    /// Configuration flags
    pub cfg_flags: CfgFlags,
    /// Host checksum
    pub checksum: [u8; 2],
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            fixed_data: [0; FIXED_SIZE],
            uid: [0; UID_SIZE],
            secret_key: [0; KEY_SIZE],
            access_code: [0; ACC_CODE_SIZE],
            fixed_size: 0,
            ext_flags: ExtFlags::empty(),
            tkt_flags: TktFlags::empty(),
            cfg_flags: CfgFlags::empty(),
            checksum: [0; 2],
        }
    }
}

impl ConfigRecord {
    /// Encode into the fixed layout, reserved bytes zeroed
    pub fn encode(&self) -> [u8; CONFIG_SIZE] {
        let mut raw = [0u8; CONFIG_SIZE];
        raw[FIXED_DATA].copy_from_slice(&self.fixed_data);
        raw[UID].copy_from_slice(&self.uid);
        raw[SECRET_KEY].copy_from_slice(&self.secret_key);
        raw[ACCESS_CODE].copy_from_slice(&self.access_code);
        raw[FIXED_SIZE_OFFSET] = self.fixed_size;
        raw[EXT_FLAGS_OFFSET] = self.ext_flags.bits();
        raw[TKT_FLAGS_OFFSET] = self.tkt_flags.bits();
        raw[CFG_FLAGS_OFFSET] = self.cfg_flags.bits();
        raw[CHECKSUM].copy_from_slice(&self.checksum);
        raw
    }
}

impl From<SlotConfig<'_>> for ConfigRecord {
    fn from(config: SlotConfig<'_>) -> Self {
        let mut record = Self {
            fixed_size: config.fixed_size(),
            ext_flags: config.ext_flags(),
            tkt_flags: config.tkt_flags(),
            cfg_flags: config.cfg_flags(),
            checksum: config.checksum(),
            ..Default::default()
        };
        record.fixed_data.copy_from_slice(config.fixed_data());
        record.uid.copy_from_slice(config.uid());
        record.secret_key.copy_from_slice(config.secret_key());
        record.access_code.copy_from_slice(config.access_code());
        record
    }
}

/// HOTP moving factor of a stored slot.
///
/// A freshly configured slot stores only the base record, and its moving factor is seeded from
/// the last two bytes of `uid`.  The first emission rewrites the slot with the 8-byte counter
/// appended, which is read back from then on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Counter {
    /// Seeded from `uid`, nothing persisted yet
    Derived(u32),
    /// Persisted after the base record
    Extended(u64),
}

impl Counter {
    /// Recover the moving factor from a stored slot blob
    pub fn load(stored: &[u8]) -> Result<Self, Error> {
        match stored.len() {
            CONFIG_SIZE => {
                let uid = &stored[UID];
                let seed = (u32::from(uid[4]) << 8 | u32::from(uid[5])) << 4;
                Ok(Counter::Derived(seed))
            }
            len if len >= RECORD_MAX_SIZE => {
                let counter: [u8; COUNTER_SIZE] = stored[CONFIG_SIZE..RECORD_MAX_SIZE]
                    .try_into()
                    .map_err(|_| Error::Corrupted)?;
                Ok(Counter::Extended(u64::from_be_bytes(counter)))
            }
            _ => Err(Error::Corrupted),
        }
    }

    /// The value fed to HOTP
    pub fn moving_factor(&self) -> u64 {
        match *self {
            Counter::Derived(seed) => seed.into(),
            Counter::Extended(counter) => counter,
        }
    }

    /// Big-endian encoding appended to the stored record
    pub fn to_bytes(&self) -> [u8; COUNTER_SIZE] {
        self.moving_factor().to_be_bytes()
    }

    /// The counter to persist after a successful emission.
    ///
    /// Always the extended representation; fails rather than wrapping around.
    pub fn next(&self) -> Result<Counter, Error> {
        self.moving_factor()
            .checked_add(1)
            .map(Counter::Extended)
            .ok_or(Error::CounterOverflow)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn record() -> ConfigRecord {
        ConfigRecord {
            fixed_data: *b"0123456789abcdef",
            uid: hex!("010203040506"),
            secret_key: [0x11; KEY_SIZE],
            access_code: hex!("a1a2a3a4a5a6"),
            fixed_size: 10,
            ext_flags: ExtFlags::ALLOW_UPDATE | ExtFlags::SERIAL_API_VISIBLE,
            tkt_flags: TktFlags::APPEND_CR | TktFlags::OATH_HOTP,
            cfg_flags: CfgFlags::OATH_HOTP8,
            checksum: hex!("bead"),
        }
    }

    #[test]
    fn layout() {
        let raw = record().encode();
        assert_eq!(&raw[..16], b"0123456789abcdef");
        assert_eq!(raw[16..22], hex!("010203040506"));
        assert_eq!(raw[22..38], [0x11; 16]);
        assert_eq!(raw[38..44], hex!("a1a2a3a4a5a6"));
        assert_eq!(raw[44..52], hex!("0a 24 60 02 0000 bead"));
    }

    #[test]
    fn decode_view() {
        let raw = record().encode();
        let config = SlotConfig::decode(&raw).unwrap();
        assert_eq!(config.fixed_data(), b"0123456789abcdef");
        assert_eq!(config.uid(), hex!("010203040506"));
        assert_eq!(config.access_code(), hex!("a1a2a3a4a5a6"));
        assert_eq!(config.fixed_size(), 10);
        assert_eq!(config.checksum(), hex!("bead"));
        assert!(config.is_hotp());
        assert!(config.hotp8());
        assert!(config.append_cr());
        assert!(config.allow_update());
        assert!(!config.dormant());
        assert!(!config.led_inverted());
        assert!(!config.protect_cfg2());
        assert!(!config.static_ticket_mode());
        assert!(!config.is_delete_request());
        assert_eq!(ConfigRecord::from(config), record());
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut blob = [0xffu8; RECORD_MAX_SIZE];
        blob[..CONFIG_SIZE].copy_from_slice(&record().encode());
        let config = SlotConfig::decode(&blob).unwrap();
        assert_eq!(config.as_bytes(), &record().encode());
    }

    #[test]
    fn decode_short() {
        let raw = record().encode();
        assert_eq!(
            SlotConfig::decode(&raw[..CONFIG_SIZE - 1]),
            Err(Status::WrongLength)
        );
        assert_eq!(SlotConfig::decode(&[]), Err(Status::WrongLength));
    }

    #[test]
    fn decode_reserved() {
        for offset in [48, 49] {
            let mut raw = record().encode();
            raw[offset] = 1;
            assert_eq!(
                SlotConfig::decode(&raw),
                Err(Status::IncorrectDataParameter)
            );
        }
    }

    #[test]
    fn delete_request() {
        let raw = [0u8; CONFIG_SIZE];
        assert!(SlotConfig::decode(&raw).unwrap().is_delete_request());

        // Zero checksum alone is not a delete
        let mut raw = [0u8; CONFIG_SIZE];
        raw[44] = 1;
        assert!(!SlotConfig::decode(&raw).unwrap().is_delete_request());

        let mut raw = [0u8; CONFIG_SIZE];
        raw[51] = 1;
        assert!(!SlotConfig::decode(&raw).unwrap().is_delete_request());
    }

    #[test]
    fn static_ticket_spills_over() {
        let raw = record().encode();
        let config = SlotConfig::decode(&raw).unwrap();
        assert_eq!(config.static_ticket(5), b"01234");
        assert_eq!(config.static_ticket(18), b"0123456789abcdef\x01\x02");
        assert_eq!(config.static_ticket(255).len(), 38);
    }

    #[test]
    fn counter_derived() {
        let mut raw = record().encode();
        raw[20] = 0x12;
        raw[21] = 0x34;
        let counter = Counter::load(&raw).unwrap();
        assert_eq!(counter, Counter::Derived(0x12340));
        assert_eq!(counter.moving_factor(), 0x12340);
        assert_eq!(counter.next(), Ok(Counter::Extended(0x12341)));
    }

    #[test]
    fn counter_extended() {
        let mut blob = [0u8; RECORD_MAX_SIZE];
        blob[..CONFIG_SIZE].copy_from_slice(&record().encode());
        blob[CONFIG_SIZE..].copy_from_slice(&hex!("0000000100000002"));
        let counter = Counter::load(&blob).unwrap();
        assert_eq!(counter, Counter::Extended(0x1_0000_0002));
        assert_eq!(counter.next(), Ok(Counter::Extended(0x1_0000_0003)));

        blob[CONFIG_SIZE..].copy_from_slice(&[0xff; 8]);
        assert_eq!(
            Counter::load(&blob).unwrap().next(),
            Err(Error::CounterOverflow)
        );
    }

    #[test]
    fn counter_corrupted() {
        let blob = [0u8; CONFIG_SIZE + 3];
        assert_eq!(Counter::load(&blob), Err(Error::Corrupted));
        assert_eq!(Counter::load(&blob[..10]), Err(Error::Corrupted));
    }
}
