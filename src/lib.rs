// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg_attr(not(test), no_std)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    non_ascii_idents,
    trivial_casts,
    unused,
    unused_qualifications,
    clippy::expect_used,
    clippy::unwrap_used
)]
#![deny(unsafe_code)]

//! OTP App emulates the Yubikey OTP applet.
//!
//! It keeps two configuration slots in the binary layout used by Yubikey personalization tools,
//! and on a button press types either an HOTP code or a static password through a virtual
//! keyboard.
//!
//! # Collaborators
//!
//! The app does not own the transport, the keyboard or the button.  It is driven by:
//!
//! - [`Authenticator::respond`] (or the `apdu_dispatch::app::App` implementation, with the
//!   `apdu-dispatch` feature) for the configuration commands sent by the host,
//! - [`Authenticator::button_pressed`] when the user triggers a slot,
//!
//! and talks to the platform through the [`backend::Storage`], [`backend::Oath`] and
//! [`backend::Keyboard`] traits.  [`backend::TrussedBackend`] provides the first two on top of a
//! Trussed client.

#[macro_use]
extern crate delog;
generate_macros!();

#[macro_use(hex)]
extern crate hex_literal;

/// This is the main module, containing the OTP App implementation.
pub mod authenticator;

pub use authenticator::{Authenticator, Options, Version};
pub mod backend;
mod calculate;
mod command;
pub use command::Command;
pub mod config;
mod credential;
pub use credential::Ticket;
mod error;
pub use error::Error;
mod oath;
pub use oath::Slot;
mod state;
pub use state::{ConfigStatus, StatusReport};

/// This is the application id, which allows to select and identify it
pub const YUBICO_OTP_AID: &[u8] = &hex!("A000000527 2001");

// class AID(bytes, Enum):
//     OTP = b'\xa0\x00\x00\x05\x27 \x20\x01'
//     MGR = b'\xa0\x00\x00\x05\x27\x47\x11\x17'
//     OATH = b'\xa0\x00\x00\x05\x27 \x21\x01'

fn ensure<T>(cond: bool, err: T) -> core::result::Result<(), T> {
    match cond {
        true => Ok(()),
        false => Err(err),
    }
}
type Result<T = ()> = iso7816::Result<T>;
