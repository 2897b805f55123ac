use std::net::Ipv4Addr;

use crate::{
    errors::DnsError,
    labelstring::LabelString,
    structs::{
        Class, Flags, Header, Message, Opcode, Question, RRClass, RRType, Type, RCODE, RR,
    },
};

pub const ANSWER_TTL: u32 = 300;

/// Ordered association from a question name to its resolved address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressMap(Vec<(LabelString, Ipv4Addr)>);

impl AddressMap {
    pub fn insert(&mut self, name: LabelString, address: Ipv4Addr) {
        match self.0.iter_mut().find(|(n, _)| n == &name) {
            Some((_, existing)) => *existing = address,
            None => self.0.push((name, address)),
        }
    }

    pub fn get(&self, name: &LabelString) -> Option<Ipv4Addr> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, address)| *address)
    }

}

impl Flags {
    /// Flags of a response to a request carrying `request` flags.
    pub fn response_to(request: &Flags) -> Self {
        let rcode = match Opcode::try_from(request.opcode) {
            Ok(Opcode::QUERY) => RCODE::NOERROR,
            Err(_) => RCODE::NOTIMP,
        };
        Flags {
            qr: true,
            opcode: request.opcode,
            rd: request.rd,
            rcode: rcode as u8,
            ..Flags::default()
        }
    }
}

impl Question {
    pub fn a(qname: LabelString) -> Self {
        Question {
            qname,
            qtype: Type::Type(RRType::A),
            qclass: Class::Class(RRClass::IN),
        }
    }
}

impl RR {
    pub fn a(name: LabelString, address: Ipv4Addr) -> Self {
        RR {
            name,
            _type: Type::Type(RRType::A),
            class: Class::Class(RRClass::IN),
            ttl: ANSWER_TTL,
            rdlength: 4,
            rdata: address.octets().to_vec(),
        }
    }

    /// The IPv4 address carried by an A record.
    pub fn address(&self) -> Option<Ipv4Addr> {
        match (&self._type, <[u8; 4]>::try_from(self.rdata.as_slice())) {
            (Type::Type(RRType::A), Ok(octets)) => Some(Ipv4Addr::from(octets)),
            _ => None,
        }
    }
}

impl Message {
    /// Query with a single A/IN question for `qname`.
    pub fn query(id: u16, flags: Flags, qname: LabelString) -> Self {
        Message {
            header: Header {
                id,
                flags,
                qdcount: 1,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            question: vec![Question::a(qname)],
            answer: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    /// Response echoing `question`, with an A answer for every question
    /// whose name has an entry in `addresses`.
    pub fn response(request: &Header, question: Vec<Question>, addresses: &AddressMap) -> Self {
        let answer: Vec<RR> = question
            .iter()
            .filter_map(|q| {
                addresses
                    .get(&q.qname)
                    .map(|address| RR::a(q.qname.clone(), address))
            })
            .collect();

        Message {
            header: Header {
                id: request.id,
                flags: Flags::response_to(&request.flags),
                qdcount: question.len() as u16,
                ancount: answer.len() as u16,
                nscount: 0,
                arcount: 0,
            },
            question,
            answer,
            authority: vec![],
            additional: vec![],
        }
    }

    /// Name and address of the first A record in the answer section.
    pub fn resolved_address(&self) -> Result<(LabelString, Ipv4Addr), DnsError> {
        self.answer
            .iter()
            .find_map(|rr| rr.address().map(|address| (rr.name.clone(), address)))
            .ok_or_else(|| DnsError::Upstream {
                message: match self.question.first() {
                    Some(q) => format!("no A record in reply for {}", q.qname),
                    None => String::from("no A record in reply"),
                },
            })
    }
}
