// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fs;

use arbitrary::{Arbitrary, Unstructured};
use clap::Parser;
use otp_app_fuzz::{Event, Input, Typed};
use trussed::types::Location;

#[derive(Parser, Debug)]
#[clap(about, version, author)]
struct Args {
    #[clap(short, long)]
    file_name: String,
}

fn main() -> Result<(), ()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let data = fs::read(args.file_name).map_err(|err| eprintln!("{err}"))?;
    let input =
        Input::arbitrary_take_rest(Unstructured::new(&data)).map_err(|err| eprintln!("{err}"))?;

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
                        if let Ok(cmd) = otp_app::Command::try_from(&command) {
                            println!(">>> {:?}", cmd);
                        } else {
                            println!(">>> (unparsed) {:?}", command);
                        }

                        response.clear();
                        let res = otp.respond(&command, &mut response);
                        println!("<<< {:?} {:02x?}", res, response);
                    }
                }
                Event::Button(second) => {
                    let slot = Event::slot(second);
                    otp.keyboard_mut().keys.clear();
                    let res = otp.button_pressed(slot);
                    println!(
                        "*** {:?}: {:?} typed {:02x?}",
                        slot,
                        res,
                        otp.keyboard_mut().keys
                    );
                }
            }
        }
    });
    Ok(())
}
