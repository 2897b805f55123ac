use std::net::Ipv4Addr;

use crate::labelstring::LabelString;
use crate::structs::*;

pub fn get_rr(name: Option<LabelString>) -> RR {
    RR {
        name: name.unwrap_or(LabelString::from("example.org")),
        _type: Type::Type(RRType::A),
        class: Class::Class(RRClass::IN),
        ttl: 10,
        rdlength: 4,
        rdata: vec![1, 2, 3, 4],
    }
}

pub fn get_message(name: Option<LabelString>) -> Message {
    Message {
        header: Header {
            id: 1,
            flags: Flags::from(288_u16),
            qdcount: 2,
            ancount: 1,
            nscount: 1,
            arcount: 1,
        },
        question: vec![
            Question {
                qname: name.clone().unwrap_or(LabelString::from("example.org")),
                qtype: Type::Type(RRType::A),
                qclass: Class::Class(RRClass::IN),
            },
            Question {
                qname: name.clone().unwrap_or(LabelString::from("example.org")),
                qtype: Type::Type(RRType::A),
                qclass: Class::Class(RRClass::IN),
            },
        ],
        answer: vec![get_rr(name.clone())],
        authority: vec![get_rr(name.clone())],
        additional: vec![get_rr(name)],
    }
}

/// Recursion desired query for every name in `names`.
pub fn get_query(id: u16, names: &[&str]) -> Message {
    Message {
        header: Header {
            id,
            flags: Flags {
                rd: true,
                ..Flags::default()
            },
            qdcount: names.len() as u16,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        },
        question: names
            .iter()
            .map(|name| Question::a(LabelString::from(name)))
            .collect(),
        answer: vec![],
        authority: vec![],
        additional: vec![],
    }
}

/// Upstream reply to `query` answering its first question with `address`.
/// The answer name is written as a pointer to the question name.
pub fn get_reply(query: &[u8], address: Ipv4Addr) -> Vec<u8> {
    let mut reply = query.to_vec();
    // QR and RA set, one answer
    reply[2] |= 0x80;
    reply[3] |= 0x80;
    reply[6..8].copy_from_slice(&1_u16.to_be_bytes());
    reply.extend([0xc0, 0x0c]);
    reply.extend(u16::to_be_bytes(RRType::A as u16));
    reply.extend(u16::to_be_bytes(RRClass::IN as u16));
    reply.extend(60_u32.to_be_bytes());
    reply.extend(4_u16.to_be_bytes());
    reply.extend(address.octets());
    reply
}
