use crate::{
    errors::DnsError,
    labelstring::LabelString,
    reader::Reader,
    structs::{Class, Flags, Header, Message, Question, RRClass, RRType, Type, RR},
};

type Result<T> = std::result::Result<T, DnsError>;

pub const HEADER_SIZE: usize = 12;
pub const MAX_NAME_SIZE: usize = 255;
pub const MAX_POINTER_HOPS: usize = 32;

impl From<Type> for u16 {
    fn from(value: Type) -> Self {
        match value {
            Type::Type(t) => t as u16,
            Type::Other(x) => x,
        }
    }
}

impl From<Class> for u16 {
    fn from(value: Class) -> Self {
        match value {
            Class::Class(t) => t as u16,
            Class::Other(x) => x,
        }
    }
}

impl From<u16> for Type {
    fn from(value: u16) -> Self {
        match RRType::try_from(value) {
            Ok(rrtype) => Type::Type(rrtype),
            Err(x) => Type::Other(x),
        }
    }
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        match RRClass::try_from(value) {
            Ok(rrclass) => Class::Class(rrclass),
            Err(x) => Class::Other(x),
        }
    }
}

impl From<u16> for Flags {
    fn from(raw: u16) -> Self {
        Flags {
            qr: raw & 0x8000 != 0,
            opcode: ((raw & 0x7800) >> 11) as u8,
            aa: raw & 0x0400 != 0,
            tc: raw & 0x0200 != 0,
            rd: raw & 0x0100 != 0,
            ra: raw & 0x0080 != 0,
            z: ((raw & 0x0070) >> 4) as u8,
            rcode: (raw & 0x000F) as u8,
        }
    }
}

impl From<Flags> for u16 {
    fn from(flags: Flags) -> Self {
        ((flags.qr as u16) << 15)
            | ((flags.opcode as u16 & 0b1111) << 11)
            | ((flags.aa as u16) << 10)
            | ((flags.tc as u16) << 9)
            | ((flags.rd as u16) << 8)
            | ((flags.ra as u16) << 7)
            | ((flags.z as u16 & 0b111) << 4)
            | (flags.rcode as u16 & 0b1111)
    }
}

pub trait FromBytes {
    fn from_bytes(reader: &mut Reader) -> Result<Self>
    where
        Self: Sized;
}

pub trait ToBytes {
    fn to_bytes(s: Self) -> Vec<u8>
    where
        Self: Sized;
}

impl FromBytes for Header {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        if reader.unread_bytes() < HEADER_SIZE {
            Err(DnsError::Parse {
                object: String::from("Header"),
                message: format!(
                    "Header needs {} bytes, got {}",
                    HEADER_SIZE,
                    reader.unread_bytes()
                ),
            })
        } else {
            Ok(Header {
                id: reader.read_u16()?,
                flags: Flags::from(reader.read_u16()?),
                qdcount: reader.read_u16()?,
                ancount: reader.read_u16()?,
                nscount: reader.read_u16()?,
                arcount: reader.read_u16()?,
            })
        }
    }
}

impl ToBytes for Header {
    fn to_bytes(header: Self) -> Vec<u8> {
        let mut result: [u8; HEADER_SIZE] = [0; HEADER_SIZE];

        result[0..2].copy_from_slice(&u16::to_be_bytes(header.id));
        result[2..4].copy_from_slice(&u16::to_be_bytes(header.flags.into()));
        result[4..6].copy_from_slice(&u16::to_be_bytes(header.qdcount));
        result[6..8].copy_from_slice(&u16::to_be_bytes(header.ancount));
        result[8..10].copy_from_slice(&u16::to_be_bytes(header.nscount));
        result[10..12].copy_from_slice(&u16::to_be_bytes(header.arcount));

        result.to_vec()
    }
}

impl FromBytes for LabelString {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let mut out = LabelString::default();

        let mut pointer = read_labels(reader, &mut out)?;
        let mut hops = 0;
        while let Some(mut pointed) = pointer {
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(DnsError::Parse {
                    object: String::from("LabelString"),
                    message: format!("more than {} pointers in one name", MAX_POINTER_HOPS),
                });
            }
            pointer = read_labels(&mut pointed, &mut out)?;
        }

        if out.wire_len() > MAX_NAME_SIZE {
            return Err(DnsError::Parse {
                object: String::from("LabelString"),
                message: format!("name {} is longer than {} bytes", out, MAX_NAME_SIZE),
            });
        }

        Ok(out)
    }
}

/// Appends labels to `out` up to the zero label or a pointer. A pointer
/// yields a reader positioned at its target.
fn read_labels<'a>(reader: &mut Reader<'a>, out: &mut LabelString) -> Result<Option<Reader<'a>>> {
    let mut start = reader.position();
    let mut code = reader.read_u8()?;
    while code != 0 && (code & 0b11000000 == 0) {
        if code as usize > reader.unread_bytes() {
            return Err(DnsError::Parse {
                object: String::from("Label"),
                message: format!("label of {} bytes runs past the end of the buffer", code),
            });
        }
        let label = String::from_utf8(reader.read(code as usize)?).map_err(|e| DnsError::Parse {
            object: String::from("Label"),
            message: e.to_string(),
        })?;
        out.extend([label]);
        start = reader.position();
        code = reader.read_u8()?;
    }

    if code & 0b11000000 == 0b11000000 {
        let offset = (((code & 0b00111111) as u16) << 8) | reader.read_u8()? as u16;
        // Only backward pointers, the target name must end before this pointer
        Ok(Some(reader.seek(offset as usize, start)?))
    } else if code != 0 {
        Err(DnsError::Parse {
            object: String::from("Label"),
            message: format!("reserved label type {:#04x}", code),
        })
    } else {
        Ok(None)
    }
}

impl ToBytes for LabelString {
    fn to_bytes(name: Self) -> Vec<u8> {
        let mut result: Vec<u8> = vec![];
        for label in name {
            result.push(label.len() as u8);
            result.extend(label.as_bytes());
        }
        result.push(0);
        result
    }
}

impl FromBytes for Question {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let qname = LabelString::from_bytes(reader)?;

        if reader.unread_bytes() < 4 {
            Err(DnsError::Parse {
                object: String::from("Question"),
                message: String::from("len of rest bytes smaller then minimum size"),
            })
        } else {
            let qtype = Type::from(reader.read_u16()?);
            let qclass = Class::from(reader.read_u16()?);

            Ok(Question {
                qname,
                qtype,
                qclass,
            })
        }
    }
}

impl ToBytes for Question {
    fn to_bytes(question: Self) -> Vec<u8> {
        let mut result = LabelString::to_bytes(question.qname);
        result.extend(u16::to_be_bytes(question.qtype.into()));
        result.extend(u16::to_be_bytes(question.qclass.into()));
        result
    }
}

impl FromBytes for RR {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let name = LabelString::from_bytes(reader)?;
        let _type = Type::from(reader.read_u16()?);
        let class = Class::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()?;
        if reader.unread_bytes() < rdlength as usize {
            Err(DnsError::Parse {
                object: String::from("RR"),
                message: String::from("len of rest of bytes smaller than rdlength"),
            })
        } else {
            Ok(RR {
                name,
                _type,
                class,
                ttl,
                rdlength,
                rdata: reader.read(rdlength as usize)?,
            })
        }
    }
}

impl ToBytes for RR {
    fn to_bytes(rr: Self) -> Vec<u8> {
        let mut result = LabelString::to_bytes(rr.name);
        result.extend(u16::to_be_bytes(rr._type.into()));
        result.extend(u16::to_be_bytes(rr.class.into()));
        result.extend(u32::to_be_bytes(rr.ttl));
        result.extend(u16::to_be_bytes(rr.rdata.len() as u16));
        result.extend(rr.rdata);
        result
    }
}

fn read_records<T: FromBytes>(reader: &mut Reader, count: u16) -> Result<Vec<T>> {
    // Never trust the declared count for the allocation size
    let mut records = Vec::with_capacity((count as usize).min(reader.unread_bytes()));
    for _ in 0..count {
        records.push(T::from_bytes(reader)?);
    }
    Ok(records)
}

impl FromBytes for Message {
    fn from_bytes(reader: &mut Reader) -> Result<Self> {
        let header = Header::from_bytes(reader)?;

        let question = read_records(reader, header.qdcount)?;
        let answer = read_records(reader, header.ancount)?;
        let authority = read_records(reader, header.nscount)?;
        let additional = read_records(reader, header.arcount)?;

        Ok(Message {
            header,
            question,
            answer,
            authority,
            additional,
        })
    }
}

impl ToBytes for Message {
    fn to_bytes(message: Self) -> Vec<u8> {
        let mut result = vec![];
        result.extend(Header::to_bytes(message.header));

        for question in message.question {
            result.extend(Question::to_bytes(question));
        }
        for answer in message.answer {
            result.extend(RR::to_bytes(answer));
        }
        for auth in message.authority {
            result.extend(RR::to_bytes(auth));
        }
        for additional in message.additional {
            result.extend(RR::to_bytes(additional));
        }
        result
    }
}
