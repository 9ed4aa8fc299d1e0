//! Capture source: the owned pcap handle the loop pulls frames from.
//!
//! [`FrameSource`] is the seam between the capture loop and the driver so the
//! loop can be fed canned frames in tests.

use log::{debug, info, trace, warn};
use pcap::{Activated, Capture, Device};
use std::path::Path;

use crate::capture::parser::LinkType;
use crate::models::config::AppConfig;
use crate::models::interface::InterfaceInfo;
use crate::utils::error::{AppError, AppResult};

/// A blocking supplier of raw frames
pub trait FrameSource {
    /// Link-layer framing of the frames this source yields
    fn link_type(&self) -> LinkType;

    /// Block until the next frame is available.
    /// Returns `Ok(None)` once the source is closed or exhausted.
    fn next_frame(&mut self) -> AppResult<Option<&[u8]>>;
}

/// Frames read from a pcap handle, live device or saved file
///
/// The handle is closed when the source is dropped.
pub struct PcapSource {
    capture: Capture<dyn Activated>,
    name: String,
    link_type: LinkType,
    buffer: Vec<u8>,
}

impl PcapSource {
    /// Open the source described by `config`: the capture file if one is
    /// given, otherwise a live device.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        match &config.read_file {
            Some(path) => Self::open_file(path, &config.filter),
            None => Self::open_live(config),
        }
    }

    /// Open a live capture and install the kernel-level filter
    pub fn open_live(config: &AppConfig) -> AppResult<Self> {
        let device = select_device(list_devices()?, config.interface.as_deref())?;
        let name = device.name.clone();

        info!(
            "Opening capture on {} (snaplen {}, promiscuous {}, timeout {}ms)",
            name, config.snaplen, config.promiscuous, config.timeout_ms
        );

        let active = Capture::from_device(device)
            .and_then(|capture| {
                capture
                    .promisc(config.promiscuous)
                    .snaplen(config.snaplen)
                    .timeout(config.timeout_ms)
                    .open()
            })
            .map_err(|source| AppError::Open {
                device: name.clone(),
                source,
            })?;

        let mut source = Self::from_capture(active.into(), name);
        source.install_filter(&config.filter)?;
        Ok(source)
    }

    /// Replay a saved capture file through the same filter
    pub fn open_file(path: &Path, filter: &str) -> AppResult<Self> {
        let name = path.display().to_string();
        info!("Reading frames from {}", name);

        let offline = Capture::from_file(path).map_err(|source| AppError::OpenFile {
            path: name.clone(),
            source,
        })?;

        let mut source = Self::from_capture(offline.into(), name);
        source.install_filter(filter)?;
        Ok(source)
    }

    fn from_capture(capture: Capture<dyn Activated>, name: String) -> Self {
        let link_type = LinkType::from(capture.get_datalink());
        debug!("Capture on {} uses link type {:?}", name, link_type);
        if let LinkType::Other(dlt) = link_type {
            warn!("Link type {} on {} is not supported, no frames will decode", dlt, name);
        }

        Self {
            capture,
            name,
            link_type,
            buffer: Vec::new(),
        }
    }

    fn install_filter(&mut self, expression: &str) -> AppResult<()> {
        info!("Applying filter: {}", expression);
        self.capture
            .filter(expression, true)
            .map_err(|source| AppError::Filter {
                expression: expression.to_string(),
                source,
            })
    }

    /// Device or file name the source reads from
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FrameSource for PcapSource {
    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn next_frame(&mut self) -> AppResult<Option<&[u8]>> {
        loop {
            match self.capture.next_packet() {
                Ok(packet) => {
                    if packet.header.caplen as usize != packet.data.len() {
                        warn!(
                            "Packet length mismatch: header says {} but data is {} bytes",
                            packet.header.caplen,
                            packet.data.len()
                        );
                    }
                    self.buffer.clear();
                    self.buffer.extend_from_slice(packet.data);
                    break;
                }
                Err(pcap::Error::TimeoutExpired) => {
                    trace!("Packet capture timed out, continuing");
                }
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(AppError::Read(e)),
            }
        }
        Ok(Some(&self.buffer))
    }
}

impl Drop for PcapSource {
    fn drop(&mut self) {
        info!("Closing capture on {}", self.name);
    }
}

/// List capture-capable devices
pub fn list_devices() -> AppResult<Vec<Device>> {
    Device::list().map_err(AppError::DeviceList)
}

/// Pick the requested device, or the first one when none is requested
pub fn select_device(devices: Vec<Device>, requested: Option<&str>) -> AppResult<Device> {
    if devices.is_empty() {
        return Err(AppError::NoDevices);
    }

    match requested {
        Some(name) => devices
            .into_iter()
            .find(|device| device.name == name)
            .ok_or_else(|| AppError::DeviceNotFound(name.to_string())),
        None => {
            let device = devices.into_iter().next().ok_or(AppError::NoDevices)?;
            info!("No interface specified, using first device: {}", device.name);
            Ok(device)
        }
    }
}

/// Describe every capture device, with MAC addresses from the OS interface table
pub fn list_interfaces() -> AppResult<Vec<InterfaceInfo>> {
    let os_interfaces = pnet_datalink::interfaces();

    Ok(list_devices()?
        .iter()
        .map(|device| {
            let mut info = InterfaceInfo::from(device);
            info.mac_address = os_interfaces
                .iter()
                .find(|iface| iface.name == device.name)
                .and_then(|iface| iface.mac)
                .map(|mac| mac.to_string());
            info
        })
        .collect())
}
