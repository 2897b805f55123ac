#![no_main]

use fwdns::{parser::FromBytes, reader::Reader, structs::Message};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = Reader::new(data);
    if let Ok(message) = Message::from_bytes(&mut reader) {
        let _ = message.resolved_address();
    }
});
