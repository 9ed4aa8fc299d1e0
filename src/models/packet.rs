use serde::Serialize;
use std::net::Ipv4Addr;

use crate::models::flags::FlagSet;

/// A TCP segment decoded from one captured frame
///
/// Borrows its payload from the frame buffer, so it cannot outlive the
/// loop iteration that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket<'a> {
    /// IPv4 source address
    pub source_ip: Ipv4Addr,

    /// IPv4 destination address
    pub dest_ip: Ipv4Addr,

    /// TCP source port
    pub source_port: u16,

    /// TCP destination port
    pub dest_port: u16,

    /// Control flags carried by the segment
    pub flags: FlagSet,

    /// Application-layer bytes following the TCP header
    pub payload: &'a [u8],
}

impl DecodedPacket<'_> {
    /// `ip:port` of the sender
    pub fn source(&self) -> String {
        format!("{}:{}", self.source_ip, self.source_port)
    }

    /// `ip:port` of the receiver
    pub fn destination(&self) -> String {
        format!("{}:{}", self.dest_ip, self.dest_port)
    }
}

/// JSON form of an accepted packet, one per output line
#[derive(Debug, Clone, Serialize)]
pub struct PacketRecord {
    /// Flags in canonical order
    pub flags: FlagSet,

    /// Source endpoint (IP:port)
    pub source: String,

    /// Destination endpoint (IP:port)
    pub destination: String,

    /// Payload length in bytes
    pub payload_len: usize,

    /// Payload as text, invalid UTF-8 replaced
    pub payload: String,
}

impl From<&DecodedPacket<'_>> for PacketRecord {
    fn from(packet: &DecodedPacket<'_>) -> Self {
        Self {
            flags: packet.flags.clone(),
            source: packet.source(),
            destination: packet.destination(),
            payload_len: packet.payload.len(),
            payload: String::from_utf8_lossy(packet.payload).into_owned(),
        }
    }
}
