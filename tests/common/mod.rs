//! Frame builders and a canned frame source shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use pnet::packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, MutableIpv4Packet};
use pnet::packet::tcp::{MutableTcpPacket, TcpFlags};
use pnet::util::MacAddr;

use tcp_capture::capture::parser::LinkType;
use tcp_capture::capture::source::FrameSource;
use tcp_capture::models::flags::TcpFlag;
use tcp_capture::AppResult;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_HEADER_LEN: usize = 20;
pub const TCP_HEADER_LEN: usize = 20;

/// Source that hands out pre-built Ethernet frames, then reports end of stream
pub struct ReplaySource {
    frames: VecDeque<Vec<u8>>,
    current: Vec<u8>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            current: Vec::new(),
        }
    }
}

impl FrameSource for ReplaySource {
    fn link_type(&self) -> LinkType {
        LinkType::Ethernet
    }

    fn next_frame(&mut self) -> AppResult<Option<&[u8]>> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.current = frame;
                Ok(Some(&self.current))
            }
            None => Ok(None),
        }
    }
}

/// Ethernet frame with an empty-ish body of the given ethertype
pub fn ethernet_frame(ethertype: EtherType, body: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; ETHERNET_HEADER_LEN + body.len()];
    let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
    eth.set_destination(MacAddr::new(0x02, 0, 0, 0, 0, 0x01));
    eth.set_source(MacAddr::new(0x02, 0, 0, 0, 0, 0x02));
    eth.set_ethertype(ethertype);
    eth.set_payload(body);
    buffer
}

/// ARP request frame
pub fn arp_frame() -> Vec<u8> {
    ethernet_frame(EtherTypes::Arp, &[0u8; 28])
}

/// Ethernet + IPv4 + TCP frame
pub fn tcp_frame(
    source: (Ipv4Addr, u16),
    destination: (Ipv4Addr, u16),
    flags: &[TcpFlag],
    payload: &[u8],
) -> Vec<u8> {
    let tcp_len = TCP_HEADER_LEN + payload.len();
    let mut segment = vec![0u8; tcp_len];
    {
        let mut tcp = MutableTcpPacket::new(&mut segment).unwrap();
        tcp.set_source(source.1);
        tcp.set_destination(destination.1);
        tcp.set_sequence(1);
        tcp.set_data_offset(5);
        let mut bits = 0;
        for flag in flags {
            bits |= match flag {
                TcpFlag::Fin => TcpFlags::FIN,
                TcpFlag::Syn => TcpFlags::SYN,
                TcpFlag::Rst => TcpFlags::RST,
                TcpFlag::Psh => TcpFlags::PSH,
                TcpFlag::Ack => TcpFlags::ACK,
                TcpFlag::Urg => TcpFlags::URG,
            };
        }
        tcp.set_flags(bits);
        tcp.set_window(64240);
        tcp.set_payload(payload);
    }

    ipv4_frame(source.0, destination.0, 6, &segment)
}

/// Ethernet + IPv4 frame around an arbitrary transport body
pub fn ipv4_frame(source: Ipv4Addr, destination: Ipv4Addr, protocol: u8, body: &[u8]) -> Vec<u8> {
    let total_len = IPV4_HEADER_LEN + body.len();
    let mut packet = vec![0u8; total_len];
    {
        let mut ip = MutableIpv4Packet::new(&mut packet).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(total_len as u16);
        ip.set_ttl(64);
        ip.set_next_level_protocol(if protocol == 6 {
            IpNextHeaderProtocols::Tcp
        } else {
            IpNextHeaderProtocols::Udp
        });
        ip.set_source(source);
        ip.set_destination(destination);
        ip.set_payload(body);
        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);
    }

    ethernet_frame(EtherTypes::Ipv4, &packet)
}

/// Minimal UDP datagram frame
pub fn udp_frame(source: Ipv4Addr, destination: Ipv4Addr) -> Vec<u8> {
    let mut datagram = vec![0u8; 8];
    datagram[0..2].copy_from_slice(&5353u16.to_be_bytes());
    datagram[2..4].copy_from_slice(&53u16.to_be_bytes());
    datagram[4..6].copy_from_slice(&8u16.to_be_bytes());
    ipv4_frame(source, destination, 17, &datagram)
}

pub fn separator() -> String {
    "=".repeat(50)
}
