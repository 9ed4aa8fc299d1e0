use std::net::Ipv4Addr;

use crate::models::flags::{FlagSet, TcpFlag};
use crate::models::packet::DecodedPacket;

/// Filter criteria evaluated against every decoded packet
///
/// Built once at startup through [`FilterSpecBuilder`] and never changed
/// afterwards. Address and port constraints must all hold; the flag
/// constraint holds when the packet carries *any* of the required flags.
/// So `--sport 443 --syn --rst` shows SYNs or RSTs from port 443, never
/// only packets with both SYN and RST set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    source_address: Option<Ipv4Addr>,
    dest_address: Option<Ipv4Addr>,
    source_port: Option<u16>,
    dest_port: Option<u16>,
    required_flags: FlagSet,
}

impl FilterSpec {
    /// Start building a filter; an unmodified builder accepts everything
    pub fn builder() -> FilterSpecBuilder {
        FilterSpecBuilder::default()
    }

    pub fn source_address(&self) -> Option<Ipv4Addr> {
        self.source_address
    }

    pub fn dest_address(&self) -> Option<Ipv4Addr> {
        self.dest_address
    }

    pub fn source_port(&self) -> Option<u16> {
        self.source_port
    }

    pub fn dest_port(&self) -> Option<u16> {
        self.dest_port
    }

    pub fn required_flags(&self) -> &FlagSet {
        &self.required_flags
    }

    /// True if no constraint is set
    pub fn is_unconstrained(&self) -> bool {
        self == &FilterSpec::default()
    }

    /// Decide whether `packet` should be shown
    pub fn accepts(&self, packet: &DecodedPacket<'_>) -> bool {
        if self.source_address.is_some_and(|addr| addr != packet.source_ip) {
            return false;
        }
        if self.dest_address.is_some_and(|addr| addr != packet.dest_ip) {
            return false;
        }
        if self.source_port.is_some_and(|port| port != packet.source_port) {
            return false;
        }
        if self.dest_port.is_some_and(|port| port != packet.dest_port) {
            return false;
        }

        // Flags are alternatives: one match is enough
        if !self.required_flags.is_empty() {
            return packet.flags.intersects(&self.required_flags);
        }

        true
    }
}

/// Builder for [`FilterSpec`]
#[derive(Debug, Clone, Default)]
pub struct FilterSpecBuilder {
    spec: FilterSpec,
}

impl FilterSpecBuilder {
    pub fn source_address(mut self, address: Option<Ipv4Addr>) -> Self {
        self.spec.source_address = address;
        self
    }

    pub fn dest_address(mut self, address: Option<Ipv4Addr>) -> Self {
        self.spec.dest_address = address;
        self
    }

    /// Port 0 leaves the constraint unset
    pub fn source_port(mut self, port: u16) -> Self {
        self.spec.source_port = (port != 0).then_some(port);
        self
    }

    /// Port 0 leaves the constraint unset
    pub fn dest_port(mut self, port: u16) -> Self {
        self.spec.dest_port = (port != 0).then_some(port);
        self
    }

    /// Add `flag` to the required set when `enabled`
    pub fn flag(mut self, flag: TcpFlag, enabled: bool) -> Self {
        if enabled {
            self.spec.required_flags.insert(flag);
        }
        self
    }

    pub fn flags<I: IntoIterator<Item = TcpFlag>>(mut self, flags: I) -> Self {
        for flag in flags {
            self.spec.required_flags.insert(flag);
        }
        self
    }

    pub fn build(self) -> FilterSpec {
        self.spec
    }
}
