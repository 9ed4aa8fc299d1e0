use log::{log_enabled, trace, Level};
use pnet::packet::{
    ethernet::{EtherType, EtherTypes, EthernetPacket},
    ip::IpNextHeaderProtocols,
    ipv4::{Ipv4Flags, Ipv4Packet},
    tcp::{TcpFlags, TcpPacket},
    vlan::VlanPacket,
};
use thiserror::Error;

use crate::models::flags::{FlagSet, TcpFlag};
use crate::models::packet::DecodedPacket;

const IPV4_MIN_HEADER_LEN: usize = 20;
const TCP_MIN_HEADER_LEN: usize = 20;
const SLL_HEADER_LEN: usize = 16;
const NULL_HEADER_LEN: usize = 4;
const AF_INET: u32 = 2;

/// Why a frame could not be turned into a [`DecodedPacket`]
///
/// None of these are fatal; the capture loop skips the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(i32),

    #[error("not an IPv4 frame")]
    NotIpv4,

    #[error("not a TCP segment (IP protocol {0})")]
    NotTcp(u8),

    #[error("IPv4 fragment")]
    Fragment,

    #[error("truncated {layer} header: need {expected} bytes, have {actual}")]
    Truncated {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed {layer} header: {reason}")]
    Malformed { layer: &'static str, reason: String },
}

/// Link-layer framing of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// DLT_EN10MB
    Ethernet,
    /// DLT_LINUX_SLL, the "any" device on Linux
    LinuxSll,
    /// DLT_RAW / DLT_IPV4: the frame starts with the IP header
    RawIp,
    /// DLT_NULL, host byte order address family
    Null,
    /// DLT_LOOP, network byte order address family
    Loop,
    Other(i32),
}

impl LinkType {
    /// Map a libpcap DLT number
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            0 => LinkType::Null,
            1 => LinkType::Ethernet,
            // OpenBSD numbers DLT_LOOP and DLT_RAW 12 and 14
            #[cfg(target_os = "openbsd")]
            12 => LinkType::Loop,
            #[cfg(not(target_os = "openbsd"))]
            12 => LinkType::RawIp,
            14 | 101 | 228 => LinkType::RawIp,
            108 => LinkType::Loop,
            113 => LinkType::LinuxSll,
            other => LinkType::Other(other),
        }
    }
}

impl From<pcap::Linktype> for LinkType {
    fn from(linktype: pcap::Linktype) -> Self {
        LinkType::from_dlt(linktype.0)
    }
}

/// Decodes captured frames into IPv4 TCP packets
pub struct PacketParser {
    link_type: LinkType,
}

impl PacketParser {
    /// Create a parser for frames of the given link type
    pub fn new(link_type: LinkType) -> Self {
        Self { link_type }
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Decode one frame. The payload of the result borrows from `frame`.
    pub fn parse_packet<'a>(&self, frame: &'a [u8]) -> Result<DecodedPacket<'a>, DecodeError> {
        let ip = self.network_layer(frame)?;
        parse_ipv4(ip)
    }

    /// Strip the link-layer header and return the IPv4 bytes
    fn network_layer<'a>(&self, frame: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        match self.link_type {
            LinkType::Ethernet => parse_ethernet(frame),
            LinkType::LinuxSll => {
                let header = frame.get(..SLL_HEADER_LEN).ok_or(DecodeError::Truncated {
                    layer: "Linux SLL",
                    expected: SLL_HEADER_LEN,
                    actual: frame.len(),
                })?;
                let protocol = EtherType(u16::from_be_bytes([header[14], header[15]]));
                if protocol != EtherTypes::Ipv4 {
                    return Err(DecodeError::NotIpv4);
                }
                Ok(&frame[SLL_HEADER_LEN..])
            }
            LinkType::RawIp => Ok(frame),
            LinkType::Null | LinkType::Loop => {
                let header = frame.get(..NULL_HEADER_LEN).ok_or(DecodeError::Truncated {
                    layer: "loopback",
                    expected: NULL_HEADER_LEN,
                    actual: frame.len(),
                })?;
                let raw = [header[0], header[1], header[2], header[3]];
                let family = if self.link_type == LinkType::Loop {
                    u32::from_be_bytes(raw)
                } else {
                    // Host byte order of the capturing machine, which may not be ours
                    match u32::from_le_bytes(raw) {
                        AF_INET => AF_INET,
                        _ => u32::from_be_bytes(raw),
                    }
                };
                if family != AF_INET {
                    return Err(DecodeError::NotIpv4);
                }
                Ok(&frame[NULL_HEADER_LEN..])
            }
            LinkType::Other(dlt) => Err(DecodeError::UnsupportedLinkType(dlt)),
        }
    }
}

/// Walk an Ethernet frame, including any 802.1Q / 802.1ad tags
fn parse_ethernet(frame: &[u8]) -> Result<&[u8], DecodeError> {
    let eth_packet = EthernetPacket::new(frame).ok_or(DecodeError::Truncated {
        layer: "Ethernet",
        expected: EthernetPacket::minimum_packet_size(),
        actual: frame.len(),
    })?;

    let header_len = EthernetPacket::minimum_packet_size();
    let mut ethertype = eth_packet.get_ethertype();
    let mut offset = header_len;

    while ethertype == EtherTypes::Vlan
        || ethertype == EtherTypes::PBridge
        || ethertype == EtherTypes::QinQ
    {
        let vlan = VlanPacket::new(&frame[offset..]).ok_or(DecodeError::Truncated {
            layer: "802.1Q",
            expected: VlanPacket::minimum_packet_size(),
            actual: frame.len() - offset,
        })?;
        if log_enabled!(Level::Trace) {
            trace!("VLAN tag {} inside frame", vlan.get_vlan_identifier());
        }
        ethertype = vlan.get_ethertype();
        offset += VlanPacket::minimum_packet_size();
    }

    if ethertype != EtherTypes::Ipv4 {
        return Err(DecodeError::NotIpv4);
    }
    Ok(&frame[offset..])
}

/// Decode an IPv4 header and the TCP segment it carries
fn parse_ipv4(data: &[u8]) -> Result<DecodedPacket<'_>, DecodeError> {
    let ipv4_packet = Ipv4Packet::new(data).ok_or(DecodeError::Truncated {
        layer: "IPv4",
        expected: IPV4_MIN_HEADER_LEN,
        actual: data.len(),
    })?;

    if ipv4_packet.get_version() != 4 {
        return Err(DecodeError::NotIpv4);
    }

    let header_len = ipv4_packet.get_header_length() as usize * 4;
    if header_len < IPV4_MIN_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "IPv4",
            reason: format!("header length {} below minimum", header_len),
        });
    }
    if data.len() < header_len {
        return Err(DecodeError::Truncated {
            layer: "IPv4",
            expected: header_len,
            actual: data.len(),
        });
    }

    // Zero total length shows up with TCP segmentation offload; trust the capture
    let total_len = match ipv4_packet.get_total_length() as usize {
        0 => data.len(),
        len if len < header_len => {
            return Err(DecodeError::Malformed {
                layer: "IPv4",
                reason: format!("total length {} shorter than header {}", len, header_len),
            })
        }
        len => len.min(data.len()),
    };

    if ipv4_packet.get_flags() & Ipv4Flags::MoreFragments != 0
        || ipv4_packet.get_fragment_offset() != 0
    {
        return Err(DecodeError::Fragment);
    }

    let protocol = ipv4_packet.get_next_level_protocol();
    if protocol != IpNextHeaderProtocols::Tcp {
        return Err(DecodeError::NotTcp(protocol.0));
    }

    let segment = &data[header_len..total_len];
    let tcp_packet = TcpPacket::new(segment).ok_or(DecodeError::Truncated {
        layer: "TCP",
        expected: TCP_MIN_HEADER_LEN,
        actual: segment.len(),
    })?;

    let data_offset = tcp_packet.get_data_offset() as usize * 4;
    if data_offset < TCP_MIN_HEADER_LEN {
        return Err(DecodeError::Malformed {
            layer: "TCP",
            reason: format!("data offset {} below minimum", data_offset),
        });
    }
    if segment.len() < data_offset {
        return Err(DecodeError::Truncated {
            layer: "TCP",
            expected: data_offset,
            actual: segment.len(),
        });
    }

    let packet = DecodedPacket {
        source_ip: ipv4_packet.get_source(),
        dest_ip: ipv4_packet.get_destination(),
        source_port: tcp_packet.get_source(),
        dest_port: tcp_packet.get_destination(),
        flags: decode_flags(tcp_packet.get_flags() as u16),
        payload: &segment[data_offset..],
    };

    if log_enabled!(Level::Trace) {
        trace!(
            "TCP {} -> {} {}, payload: {} bytes",
            packet.source(),
            packet.destination(),
            packet.flags,
            packet.payload.len()
        );
    }

    Ok(packet)
}

/// Translate the header's control bits; ECE and CWR are ignored
fn decode_flags(bits: u16) -> FlagSet {
    TcpFlag::ALL
        .into_iter()
        .filter(|flag| {
            let mask = match flag {
                TcpFlag::Fin => TcpFlags::FIN,
                TcpFlag::Syn => TcpFlags::SYN,
                TcpFlag::Rst => TcpFlags::RST,
                TcpFlag::Psh => TcpFlags::PSH,
                TcpFlag::Ack => TcpFlags::ACK,
                TcpFlag::Urg => TcpFlags::URG,
            };
            bits & mask as u16 != 0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    /// IPv4 + TCP bytes: 10.0.0.5:51000 -> 10.0.0.1:443
    fn ipv4_tcp(flags: u8, payload: &[u8]) -> Vec<u8> {
        let total = 40 + payload.len();
        let mut pkt = vec![0u8; total];
        pkt[0] = 0x45; // version 4, IHL 5
        pkt[2..4].copy_from_slice(&(total as u16).to_be_bytes());
        pkt[8] = 64; // TTL
        pkt[9] = 6; // TCP
        pkt[12..16].copy_from_slice(&[10, 0, 0, 5]);
        pkt[16..20].copy_from_slice(&[10, 0, 0, 1]);
        pkt[20..22].copy_from_slice(&51000u16.to_be_bytes());
        pkt[22..24].copy_from_slice(&443u16.to_be_bytes());
        pkt[32] = 0x50; // data offset 5
        pkt[33] = flags;
        pkt[40..].copy_from_slice(payload);
        pkt
    }

    fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn ethernet_parser() -> PacketParser {
        PacketParser::new(LinkType::Ethernet)
    }

    #[test]
    fn decodes_ethernet_syn() {
        let frame = ethernet(0x0800, &ipv4_tcp(0x02, b""));
        let packet = ethernet_parser().parse_packet(&frame).unwrap();

        assert_eq!(packet.source_ip, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(packet.dest_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(packet.source_port, 51000);
        assert_eq!(packet.dest_port, 443);
        assert_eq!(packet.flags, FlagSet::from([TcpFlag::Syn]));
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn payload_is_everything_after_tcp_header() {
        let frame = ethernet(0x0800, &ipv4_tcp(0x18, b"hello"));
        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert_eq!(packet.payload, b"hello");
        assert_eq!(packet.flags, FlagSet::from([TcpFlag::Psh, TcpFlag::Ack]));
    }

    #[test]
    fn ethernet_padding_is_not_payload() {
        let mut frame = ethernet(0x0800, &ipv4_tcp(0x10, b""));
        frame.extend_from_slice(&[0u8; 6]);
        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn tcp_options_are_skipped() {
        let mut ip = ipv4_tcp(0x02, b"");
        // data offset 6: four bytes of options (MSS)
        ip[32] = 0x60;
        ip.extend_from_slice(&[2, 4, 0x05, 0xb4]);
        let total = ip.len() as u16;
        ip[2..4].copy_from_slice(&total.to_be_bytes());

        let frame = ethernet(0x0800, &ip);
        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn ece_and_cwr_are_ignored() {
        let frame = ethernet(0x0800, &ipv4_tcp(0xc2, b""));
        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert_eq!(packet.flags.to_string(), "[SYN]");
    }

    #[test]
    fn arp_is_not_decodable() {
        let frame = ethernet(0x0806, &[0u8; 28]);
        assert_eq!(ethernet_parser().parse_packet(&frame), Err(DecodeError::NotIpv4));
    }

    #[test]
    fn ipv6_is_not_decodable() {
        let frame = ethernet(0x86dd, &[0x60; 60]);
        assert_eq!(ethernet_parser().parse_packet(&frame), Err(DecodeError::NotIpv4));
    }

    #[test]
    fn udp_is_not_decodable() {
        let mut ip = ipv4_tcp(0, b"");
        ip[9] = 17;
        let frame = ethernet(0x0800, &ip);
        assert_eq!(ethernet_parser().parse_packet(&frame), Err(DecodeError::NotTcp(17)));
    }

    #[test]
    fn fragments_are_not_decodable() {
        let mut ip = ipv4_tcp(0x02, b"");
        ip[6] = 0x20; // more fragments
        assert_eq!(
            ethernet_parser().parse_packet(&ethernet(0x0800, &ip)),
            Err(DecodeError::Fragment)
        );

        let mut ip = ipv4_tcp(0x02, b"");
        ip[7] = 0x10; // offset 16
        assert_eq!(
            ethernet_parser().parse_packet(&ethernet(0x0800, &ip)),
            Err(DecodeError::Fragment)
        );
    }

    #[test]
    fn truncated_frames_are_not_decodable() {
        let parser = ethernet_parser();
        assert!(matches!(
            parser.parse_packet(&[0u8; 10]),
            Err(DecodeError::Truncated { layer: "Ethernet", .. })
        ));

        let full = ethernet(0x0800, &ipv4_tcp(0x02, b""));
        assert!(matches!(
            parser.parse_packet(&full[..14 + 12]),
            Err(DecodeError::Truncated { layer: "IPv4", .. })
        ));
        assert!(matches!(
            parser.parse_packet(&full[..14 + 30]),
            Err(DecodeError::Truncated { layer: "TCP", .. })
        ));
    }

    #[test]
    fn bad_header_lengths_are_malformed() {
        let mut ip = ipv4_tcp(0x02, b"");
        ip[0] = 0x44;
        assert!(matches!(
            ethernet_parser().parse_packet(&ethernet(0x0800, &ip)),
            Err(DecodeError::Malformed { layer: "IPv4", .. })
        ));

        let mut ip = ipv4_tcp(0x02, b"");
        ip[32] = 0x40;
        assert!(matches!(
            ethernet_parser().parse_packet(&ethernet(0x0800, &ip)),
            Err(DecodeError::Malformed { layer: "TCP", .. })
        ));

        let mut ip = ipv4_tcp(0x02, b"");
        ip[2..4].copy_from_slice(&10u16.to_be_bytes());
        assert!(matches!(
            ethernet_parser().parse_packet(&ethernet(0x0800, &ip)),
            Err(DecodeError::Malformed { layer: "IPv4", .. })
        ));
    }

    #[test]
    fn zero_total_length_uses_captured_length() {
        let mut ip = ipv4_tcp(0x18, b"data");
        ip[2..4].copy_from_slice(&[0, 0]);
        let frame = ethernet(0x0800, &ip);
        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert_eq!(packet.payload, b"data");
    }

    #[test]
    fn vlan_tags_are_unwrapped() {
        let mut tagged = vec![0x00, 0x64, 0x08, 0x00]; // VLAN 100, inner IPv4
        tagged.extend_from_slice(&ipv4_tcp(0x04, b""));
        let frame = ethernet(0x8100, &tagged);

        let packet = ethernet_parser().parse_packet(&frame).unwrap();
        assert_eq!(packet.flags, FlagSet::from([TcpFlag::Rst]));
    }

    #[test]
    fn linux_cooked_capture() {
        let mut frame = vec![0u8; 14];
        frame.extend_from_slice(&0x0800u16.to_be_bytes());
        frame.extend_from_slice(&ipv4_tcp(0x01, b""));

        let packet = PacketParser::new(LinkType::LinuxSll)
            .parse_packet(&frame)
            .unwrap();
        assert_eq!(packet.flags, FlagSet::from([TcpFlag::Fin]));
    }

    #[test]
    fn raw_ip_and_loopback_framing() {
        let ip = ipv4_tcp(0x20, b"");
        let packet = PacketParser::new(LinkType::RawIp).parse_packet(&ip).unwrap();
        assert_eq!(packet.flags, FlagSet::from([TcpFlag::Urg]));

        let mut null_frame = 2u32.to_le_bytes().to_vec();
        null_frame.extend_from_slice(&ip);
        assert!(PacketParser::new(LinkType::Null).parse_packet(&null_frame).is_ok());

        let mut loop_frame = 2u32.to_be_bytes().to_vec();
        loop_frame.extend_from_slice(&ip);
        assert!(PacketParser::new(LinkType::Loop).parse_packet(&loop_frame).is_ok());

        let mut inet6 = 30u32.to_le_bytes().to_vec();
        inet6.extend_from_slice(&ip);
        assert_eq!(
            PacketParser::new(LinkType::Null).parse_packet(&inet6),
            Err(DecodeError::NotIpv4)
        );
    }

    #[test]
    fn unknown_link_type_is_not_decodable() {
        let parser = PacketParser::new(LinkType::from_dlt(127));
        assert_eq!(
            parser.parse_packet(&ipv4_tcp(0x02, b"")),
            Err(DecodeError::UnsupportedLinkType(127))
        );
    }

    #[test]
    fn dlt_numbers_map_to_link_types() {
        assert_eq!(LinkType::from_dlt(1), LinkType::Ethernet);
        assert_eq!(LinkType::from_dlt(113), LinkType::LinuxSll);
        assert_eq!(LinkType::from_dlt(101), LinkType::RawIp);
        assert_eq!(LinkType::from_dlt(0), LinkType::Null);
        assert_eq!(LinkType::from_dlt(108), LinkType::Loop);
        assert_eq!(LinkType::from(pcap::Linktype::ETHERNET), LinkType::Ethernet);
    }

    #[test]
    fn platform_dlt_numbers_for_raw_and_loop() {
        assert_eq!(LinkType::from_dlt(14), LinkType::RawIp);
        assert_eq!(LinkType::from_dlt(228), LinkType::RawIp);

        #[cfg(target_os = "openbsd")]
        assert_eq!(LinkType::from_dlt(12), LinkType::Loop);
        #[cfg(not(target_os = "openbsd"))]
        assert_eq!(LinkType::from_dlt(12), LinkType::RawIp);
    }
}
