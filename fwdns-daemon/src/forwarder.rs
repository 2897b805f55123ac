use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use fwdns::errors::DnsError;
use fwdns::labelstring::LabelString;
use fwdns::parser::{FromBytes, ToBytes};
use fwdns::reader::Reader;
use fwdns::structs::{Header, Message};
use tracing::{debug, warn};

use crate::resolver::MAX_DATAGRAM_SIZE;
use crate::transport::Transport;

/// The resolver every question is forwarded to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upstream {
    pub address: SocketAddr,
    /// No timeout means the receive blocks until a datagram arrives.
    pub timeout: Option<Duration>,
}

fn upstream_error(message: String) -> DnsError {
    DnsError::Upstream { message }
}

/// Asks `upstream` for the A record of `qname` with a single question query
/// carrying the id and flags of the client `request`.
pub async fn forward<T: Transport>(
    transport: &T,
    upstream: &Upstream,
    request: &Header,
    qname: &LabelString,
) -> Result<Ipv4Addr, DnsError> {
    let query = Message::query(request.id, request.flags, qname.clone());

    transport
        .send_to(&Message::to_bytes(query), upstream.address)
        .await
        .map_err(|e| {
            upstream_error(format!(
                "cannot send query for {} to {}: {}",
                qname, upstream.address, e
            ))
        })?;

    let reply = match upstream.timeout {
        Some(duration) => {
            tokio::time::timeout(duration, receive_reply(transport, upstream, request.id, qname))
                .await
                .map_err(|_| {
                    upstream_error(format!(
                        "no reply for {} from {} within {:?}",
                        qname, upstream.address, duration
                    ))
                })??
        }
        None => receive_reply(transport, upstream, request.id, qname).await?,
    };

    let (name, address) = reply.resolved_address()?;
    debug!(%name, %address, upstream = %upstream.address, "resolved");
    Ok(address)
}

/// Receives until the upstream answers the query for `qname` with `id`.
/// Datagrams from other sources and replies to earlier queries are skipped.
async fn receive_reply<T: Transport>(
    transport: &T,
    upstream: &Upstream,
    id: u16,
    qname: &LabelString,
) -> Result<Message, DnsError> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, from) = transport.recv_from(&mut buf).await.map_err(|e| {
            upstream_error(format!(
                "cannot receive reply for {} from {}: {}",
                qname, upstream.address, e
            ))
        })?;

        if from != upstream.address {
            warn!(
                expected = %upstream.address,
                received_from = %from,
                "skipping datagram from unexpected source"
            );
            continue;
        }

        let reply = Message::from_bytes(&mut Reader::new(&buf[..len]))
            .map_err(|e| upstream_error(format!("malformed reply from {}: {}", from, e)))?;

        let answers_query = reply.header.flags.qr
            && reply.header.id == id
            && reply.question.first().is_some_and(|q| &q.qname == qname);
        if !answers_query {
            warn!(
                expected_id = id,
                received_id = reply.header.id,
                %qname,
                "skipping reply to another query"
            );
            continue;
        }

        return Ok(reply);
    }
}
