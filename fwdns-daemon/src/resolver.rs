use std::io;

use fwdns::errors::DnsError;
use fwdns::message::AddressMap;
use fwdns::parser::{FromBytes, ToBytes};
use fwdns::reader::Reader;
use fwdns::structs::Message;
use tracing::{debug, info, warn};

use crate::forwarder::{forward, Upstream};
use crate::transport::Transport;

pub const MAX_DATAGRAM_SIZE: usize = 512;

/// Builds the reply to one client datagram, forwarding its questions one by one.
pub async fn get_response<T: Transport>(
    transport: &T,
    upstream: &Upstream,
    bytes: &[u8],
) -> Result<Vec<u8>, DnsError> {
    let mut reader = Reader::new(bytes);
    let request = Message::from_bytes(&mut reader)?;
    if request.header.flags.qr {
        return Err(DnsError::Parse {
            object: String::from("Header"),
            message: String::from("datagram is a response, not a query"),
        });
    }

    let mut addresses = AddressMap::default();
    for question in &request.question {
        let address = forward(transport, upstream, &request.header, &question.qname).await?;
        addresses.insert(question.qname.clone(), address);
    }

    let response = Message::response(&request.header, request.question, &addresses);
    Ok(Message::to_bytes(response))
}

/// Serves clients on `socket` until receiving from it fails.
pub async fn udp_listener_loop<T: Transport>(socket: &T, upstream: &Upstream) -> io::Result<()> {
    loop {
        let mut data = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, addr) = socket.recv_from(&mut data).await?;
        debug!(client = %addr, bytes = len, "received datagram");

        if addr == upstream.address {
            warn!(upstream = %addr, "dropping datagram from upstream outside an exchange");
            continue;
        }

        let response = match get_response(socket, upstream, &data[..len]).await {
            Ok(response) => response,
            Err(e) if e.is_format_error() => {
                warn!(client = %addr, error = %e, "dropping malformed datagram");
                continue;
            }
            Err(e) => {
                warn!(client = %addr, error = %e, "dropping request");
                continue;
            }
        };

        if response.len() > MAX_DATAGRAM_SIZE {
            warn!(client = %addr, bytes = response.len(), "response exceeds 512 bytes");
        }

        match socket.send_to(&response, addr).await {
            Ok(_) => info!(client = %addr, bytes = response.len(), "answered"),
            Err(e) => warn!(client = %addr, error = %e, "cannot send response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use fwdns::labelstring::LabelString;
    use fwdns::structs::{Flags, Header, Question, RCODE};
    use fwdns::test_utils::{get_query, get_reply};

    use crate::transport::tests::FakeTransport;

    use super::*;

    const CLIENT: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);

    fn upstream() -> Upstream {
        Upstream {
            address: SocketAddr::from(([127, 0, 0, 1], 5353)),
            timeout: None,
        }
    }

    fn parse(bytes: &[u8]) -> Message {
        Message::from_bytes(&mut Reader::new(bytes)).unwrap()
    }

    #[tokio::test]
    async fn test_get_response() {
        let upstream = upstream();
        let transport = FakeTransport::new(
            upstream.address,
            &[("codecrafters.io", Ipv4Addr::new(8, 8, 8, 8))],
        );

        let mut request = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        request.push(12);
        request.extend(b"codecrafters");
        request.push(2);
        request.extend(b"io");
        request.extend([0, 0, 1, 0, 1]);

        let response = get_response(&transport, &upstream, &request).await.unwrap();

        let forwarded = transport.sent_to(upstream.address);
        assert_eq!(forwarded.len(), 1);
        // the upstream query is the client's request byte for byte
        assert_eq!(forwarded[0], request);

        let mut expected = request.clone();
        expected[2] = 0x81;
        expected[7] = 1;
        expected.extend(&request[12..29]);
        expected.extend([0, 1, 0, 1, 0, 0, 0x01, 0x2c, 0, 4, 8, 8, 8, 8]);
        assert_eq!(response, expected);

        let response = parse(&response);
        assert_eq!(response.header.id, 0x1234);
        assert!(response.header.flags.qr);
        assert!(response.header.flags.rd);
        assert_eq!(response.header.flags.rcode, RCODE::NOERROR as u8);
        assert_eq!(response.answer[0].ttl, 300);
        assert_eq!(response.answer[0].rdata, vec![8, 8, 8, 8]);
    }

    #[tokio::test]
    async fn test_get_response_multiple_questions() {
        let upstream = upstream();
        let transport = FakeTransport::new(
            upstream.address,
            &[
                ("b.com", Ipv4Addr::new(2, 2, 2, 2)),
                ("a.com", Ipv4Addr::new(1, 1, 1, 1)),
            ],
        );
        let request = get_query(42, &["a.com", "b.com"]);

        let response = get_response(&transport, &upstream, &Message::to_bytes(request))
            .await
            .unwrap();

        let forwarded: Vec<Message> = transport
            .sent_to(upstream.address)
            .iter()
            .map(|bytes| parse(bytes))
            .collect();
        assert_eq!(forwarded.len(), 2);
        for (query, name) in forwarded.iter().zip(["a.com", "b.com"]) {
            assert_eq!(query.header.id, 42);
            assert_eq!(query.header.qdcount, 1);
            assert_eq!(query.question, vec![Question::a(LabelString::from(name))]);
        }

        let response = parse(&response);
        assert_eq!(response.header.qdcount, 2);
        assert_eq!(response.header.ancount, 2);
        assert_eq!(
            response.question,
            vec![
                Question::a(LabelString::from("a.com")),
                Question::a(LabelString::from("b.com"))
            ]
        );
        assert_eq!(response.answer[0].name, LabelString::from("a.com"));
        assert_eq!(response.answer[0].address(), Some(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(response.answer[1].name, LabelString::from("b.com"));
        assert_eq!(response.answer[1].address(), Some(Ipv4Addr::new(2, 2, 2, 2)));
    }

    #[tokio::test]
    async fn test_get_response_unsupported_opcode() {
        let upstream = upstream();
        let transport =
            FakeTransport::new(upstream.address, &[("example.com", Ipv4Addr::LOCALHOST)]);
        let mut request = get_query(9, &["example.com"]);
        request.header.flags = Flags {
            opcode: 1,
            rd: false,
            ..Flags::default()
        };

        let response = get_response(&transport, &upstream, &Message::to_bytes(request))
            .await
            .unwrap();

        let response = parse(&response);
        assert_eq!(response.header.flags.rcode, RCODE::NOTIMP as u8);
        assert_eq!(response.header.flags.opcode, 1);
        assert!(!response.header.flags.rd);
        assert!(response.header.flags.qr);
        assert_eq!(response.header.ancount, 1);
    }

    #[tokio::test]
    async fn test_get_response_malformed() {
        let upstream = upstream();
        let transport = FakeTransport::new(upstream.address, &[]);

        let result = get_response(&transport, &upstream, &[0x12, 0x34, 0x01]).await;
        assert!(result.is_err_and(|e| e.is_format_error()));

        let mut request = Message::to_bytes(get_query(1, &["example.com"]));
        request[5] = 2;
        let result = get_response(&transport, &upstream, &request).await;
        assert!(result.is_err_and(|e| e.is_format_error()));

        assert!(transport.sent_to(upstream.address).is_empty());
    }

    #[tokio::test]
    async fn test_get_response_rejects_responses() {
        let upstream = upstream();
        let transport = FakeTransport::new(upstream.address, &[("a.com", Ipv4Addr::LOCALHOST)]);
        let query = Message::to_bytes(get_query(5, &["a.com"]));
        let reply = get_reply(&query, Ipv4Addr::LOCALHOST);

        let result = get_response(&transport, &upstream, &reply).await;
        assert!(result.is_err_and(|e| e.is_format_error()));
        assert!(transport.sent_to(upstream.address).is_empty());
    }

    #[tokio::test]
    async fn test_listener_loop_survives_bad_datagrams() {
        let upstream = upstream();
        let client = SocketAddr::from(CLIENT);
        let transport = FakeTransport::new(
            upstream.address,
            &[("codecrafters.io", Ipv4Addr::new(8, 8, 8, 8))],
        );

        // truncated header
        transport.push(vec![0x12, 0x34, 0x01, 0x00, 0x00], client);
        // label running past the end of the datagram
        let mut bad_label = Message::to_bytes(get_query(2, &["codecrafters.io"]));
        bad_label.truncate(16);
        transport.push(bad_label, client);
        transport.push(Message::to_bytes(get_query(4, &["codecrafters.io"])), client);
        // no upstream answer for this one, the exchange fails once the
        // transport runs dry
        transport.push(Message::to_bytes(get_query(3, &["unknown.org"])), client);

        let result = udp_listener_loop(&transport, &upstream).await;
        assert!(result.is_err());

        assert_eq!(transport.sent_to(upstream.address).len(), 2);
        let replies = transport.sent_to(client);
        assert_eq!(replies.len(), 1);
        let reply = parse(&replies[0]);
        assert_eq!(
            reply.header,
            Header {
                id: 4,
                flags: Flags {
                    qr: true,
                    rd: true,
                    ..Flags::default()
                },
                qdcount: 1,
                ancount: 1,
                nscount: 0,
                arcount: 0,
            }
        );
        assert_eq!(reply.answer[0].address(), Some(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[tokio::test]
    async fn test_listener_loop_ignores_replies() {
        let upstream = upstream();
        let client = SocketAddr::from(CLIENT);
        let transport = FakeTransport::new(
            upstream.address,
            &[("codecrafters.io", Ipv4Addr::new(8, 8, 8, 8))],
        );
        let query = Message::to_bytes(get_query(6, &["codecrafters.io"]));

        // late upstream reply arriving while no exchange is in flight
        transport.push(get_reply(&query, Ipv4Addr::new(8, 8, 8, 8)), upstream.address);
        // a client sending a response instead of a query
        transport.push(get_reply(&query, Ipv4Addr::new(8, 8, 8, 8)), client);

        let result = udp_listener_loop(&transport, &upstream).await;
        assert!(result.is_err());
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
