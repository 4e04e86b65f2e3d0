#![no_main]

// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use libfuzzer_sys::fuzz_target;
use otp_app_fuzz::{Event, Input, Typed};
use trussed::types::Location;

fuzz_target!(|input: Input| {
    trussed::virt::with_ram_client("otp", move |client| {
        let options = otp_app::Options::new(Location::Internal, Default::default(), input.serial);
        let mut otp = otp_app::Authenticator::with_client(client, Typed::default(), options);

        let mut response = heapless::Vec::<u8, { 3 * 1024 }>::new();

        for event in input.events {
            match event {
                Event::Apdu(data) => {
                    if let Ok(command) =
                        iso7816::Command::<{ 10 * 255 }>::try_from(data.as_slice())
                    {
                        response.clear();
                        otp.respond(&command, &mut response).ok();
                    }
                }
                Event::Button(second) => {
                    otp.button_pressed(Event::slot(second)).ok();
                }
            }
        }
    })
});
