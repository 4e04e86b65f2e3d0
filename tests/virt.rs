// Copyright (C) 2023 Nitrokey GmbH
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hex_literal::hex;
use iso7816::{Data, Status};
use otp_app::backend::{Keyboard, TrussedBackend};
use otp_app::config::{CfgFlags, ConfigRecord, TktFlags, CONFIG_SIZE};
use otp_app::{Authenticator, Options, Slot, Version};
use trussed::client::FilesystemClient;
use trussed::syscall;
use trussed::types::{Location, PathBuf};

#[derive(Debug, Default)]
struct Typed {
    lines: Vec<Vec<u8>>,
}

impl Keyboard for Typed {
    fn type_bytes(&mut self, data: &[u8], _printable: bool) {
        self.lines.push(data.to_vec());
    }

    fn press(&mut self, key: u8) {
        if let Some(line) = self.lines.last_mut() {
            line.push(key);
        }
    }
}

const OPTIONS: Options = Options::new(
    Location::Internal,
    Version {
        major: 5,
        minor: 4,
        patch: 3,
    },
    hex!("00c0ffee"),
);

fn send<T, K>(
    otp: &mut Authenticator<TrussedBackend<T>, K>,
    header: [u8; 4],
    data: &[u8],
) -> Result<Vec<u8>, Status>
where
    T: trussed::client::Client + trussed::client::HmacSha1,
    K: Keyboard,
{
    let mut raw = header.to_vec();
    if !data.is_empty() {
        raw.push(data.len() as u8);
        raw.extend_from_slice(data);
    }
    let command = iso7816::Command::<1024>::try_from(raw.as_slice()).unwrap();
    let mut reply = Data::<1024>::new();
    otp.respond(&command, &mut reply)?;
    Ok(reply.to_vec())
}

fn configure_payload(record: &[u8], access_code: [u8; 6]) -> Vec<u8> {
    let mut data = record.to_vec();
    data.extend_from_slice(&access_code);
    data
}

fn hotp(tkt_flags: TktFlags, cfg_flags: CfgFlags, access_code: [u8; 6]) -> [u8; CONFIG_SIZE] {
    ConfigRecord {
        access_code,
        tkt_flags: tkt_flags | TktFlags::OATH_HOTP,
        cfg_flags,
        ..Default::default()
    }
    .encode()
}

#[test]
fn hotp_codes() {
    pretty_env_logger::try_init().ok();
    trussed::virt::with_ram_client("otp", |client| {
        let mut otp = Authenticator::with_client(client, Typed::default(), OPTIONS);

        assert_eq!(
            send(&mut otp, hex!("00A40400"), &hex!("A0000005272001")).unwrap(),
            hex!("05 04 00 00 0c 00")
        );
        let record = hotp(TktFlags::APPEND_CR, CfgFlags::empty(), [0; 6]);
        assert_eq!(
            send(&mut otp, hex!("00010100"), &configure_payload(&record, [0; 6])).unwrap(),
            hex!("05 04 00 01 0d 00")
        );

        for _ in 0..3 {
            otp.button_pressed(Slot::One).unwrap();
        }
        assert_eq!(
            otp.keyboard_mut().lines,
            [
                b"569809\r".to_vec(),
                b"112887\r".to_vec(),
                b"553374\r".to_vec()
            ]
        );

        let stored = syscall!(otp
            .backend_mut()
            .client_mut()
            .read_file(Location::Internal, PathBuf::from("slot1.otp")))
        .data;
        assert_eq!(stored.len(), CONFIG_SIZE + 8);
        assert_eq!(stored[..CONFIG_SIZE], record);
        assert_eq!(stored[CONFIG_SIZE..], hex!("0000000000000003"));

        // A new configuration starts over from the uid seed
        send(&mut otp, hex!("00010100"), &configure_payload(&record, [0; 6])).unwrap();
        otp.keyboard_mut().lines.clear();
        otp.button_pressed(Slot::One).unwrap();
        assert_eq!(otp.keyboard_mut().lines, [b"569809\r".to_vec()]);
    })
}

#[test]
fn hotp_eight_digits() {
    trussed::virt::with_ram_client("otp", |client| {
        let mut otp = Authenticator::with_client(client, Typed::default(), OPTIONS);
        let record = hotp(TktFlags::empty(), CfgFlags::OATH_HOTP8, [0; 6]);
        send(&mut otp, hex!("00010300"), &configure_payload(&record, [0; 6])).unwrap();

        otp.button_pressed(Slot::Two).unwrap();
        otp.button_pressed(Slot::Two).unwrap();
        assert_eq!(
            otp.keyboard_mut().lines,
            [b"94569809".to_vec(), b"54112887".to_vec()]
        );
        // Slot 1 is untouched
        otp.button_pressed(Slot::One).unwrap();
        assert_eq!(otp.keyboard_mut().lines.len(), 2);
    })
}

#[test]
fn static_password_and_delete() {
    trussed::virt::with_ram_client("otp", |client| {
        let mut otp = Authenticator::with_client(client, Typed::default(), OPTIONS);
        let access_code = hex!("313233343536");
        let record = ConfigRecord {
            fixed_data: *b"hunter2 hunter2 ",
            fixed_size: 14,
            access_code,
            tkt_flags: TktFlags::APPEND_CR,
            cfg_flags: CfgFlags::SHORT_TICKET,
            ..Default::default()
        }
        .encode();
        send(&mut otp, hex!("00010300"), &configure_payload(&record, [0; 6])).unwrap();

        otp.button_pressed(Slot::Two).unwrap();
        assert_eq!(otp.keyboard_mut().lines, [b"hunter2\x28".to_vec()]);

        // The access code now protects the slot
        assert_eq!(
            send(
                &mut otp,
                hex!("00010300"),
                &configure_payload(&[0; CONFIG_SIZE], [0; 6])
            ),
            Err(Status::SecurityStatusNotSatisfied)
        );
        assert_eq!(
            send(
                &mut otp,
                hex!("00010300"),
                &configure_payload(&[0; CONFIG_SIZE], access_code)
            )
            .unwrap(),
            hex!("05 04 00 00 0c 00")
        );

        let metadata = syscall!(otp
            .backend_mut()
            .client_mut()
            .entry_metadata(Location::Internal, PathBuf::from("slot2.otp")))
        .metadata;
        assert!(metadata.is_none());

        otp.keyboard_mut().lines.clear();
        otp.button_pressed(Slot::Two).unwrap();
        assert!(otp.keyboard_mut().lines.is_empty());
    })
}

#[test]
fn device_id() {
    trussed::virt::with_ram_client("otp", |client| {
        let mut otp = Authenticator::with_client(client, Typed::default(), OPTIONS);
        assert_eq!(
            send(&mut otp, hex!("00011000"), &[]).unwrap(),
            hex!("00c0ffee")
        );
    })
}
