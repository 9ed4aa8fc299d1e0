use std::fmt;
use std::net::IpAddr;

/// Information about a capture-capable network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Device system name (used for capture operations)
    pub device_name: String,

    /// Driver-supplied description
    pub description: Option<String>,

    /// First IPv4 address (if available)
    pub ipv4_address: Option<String>,

    /// MAC address (if available)
    pub mac_address: Option<String>,

    /// Whether this is a loopback interface
    pub is_loopback: bool,

    /// Whether this interface is up/active
    pub is_up: bool,
}

impl From<&pcap::Device> for InterfaceInfo {
    fn from(device: &pcap::Device) -> Self {
        let ipv4_address = device.addresses.iter().find_map(|address| match address.addr {
            IpAddr::V4(ip) => Some(ip.to_string()),
            IpAddr::V6(_) => None,
        });

        Self {
            device_name: device.name.clone(),
            description: device.desc.clone(),
            ipv4_address,
            mac_address: None,
            is_loopback: device.flags.is_loopback(),
            is_up: device.flags.is_up(),
        }
    }
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = Vec::new();
        if self.is_up {
            state.push("up");
        }
        if self.is_loopback {
            state.push("loopback");
        }

        write!(
            f,
            "{:<16} {:<16} {:<18} {:<10} {}",
            self.device_name,
            self.ipv4_address.as_deref().unwrap_or("-"),
            self.mac_address.as_deref().unwrap_or("-"),
            state.join(","),
            self.description.as_deref().unwrap_or("")
        )
    }
}
