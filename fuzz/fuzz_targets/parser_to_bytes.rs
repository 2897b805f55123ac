#![no_main]

use fwdns::{
    parser::{FromBytes, ToBytes},
    reader::Reader,
    structs::Message,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|message: Message| {
    let bytes = Message::to_bytes(message);
    let _ = Message::from_bytes(&mut Reader::new(&bytes));
});
