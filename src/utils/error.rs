use thiserror::Error;

/// Application error types
///
/// Every variant except `Read` and `Io` is raised while the capture is being
/// set up and ends the process. Per-frame decode failures are not errors at
/// this level, see [`crate::capture::parser::DecodeError`].
#[derive(Error, Debug)]
pub enum AppError {
    /// The driver reported no capture-capable devices
    #[error("no capture devices found")]
    NoDevices,

    /// The requested interface is not in the device list
    #[error("capture device '{0}' not found")]
    DeviceNotFound(String),

    /// Device enumeration failed
    #[error("failed to list capture devices: {0}")]
    DeviceList(#[source] pcap::Error),

    /// Opening a live capture handle failed
    #[error("failed to open capture on '{device}': {source}")]
    Open {
        device: String,
        #[source]
        source: pcap::Error,
    },

    /// Opening a saved capture file failed
    #[error("failed to open capture file '{path}': {source}")]
    OpenFile {
        path: String,
        #[source]
        source: pcap::Error,
    },

    /// The kernel-level filter could not be compiled or installed
    #[error("failed to install capture filter '{expression}': {source}")]
    Filter {
        expression: String,
        #[source]
        source: pcap::Error,
    },

    /// Reading the next frame failed for a reason other than a timeout
    #[error("failed to read from capture: {0}")]
    Read(#[source] pcap::Error),

    /// An address filter argument is not a dotted-quad IPv4 address
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    /// Error from I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for application
pub type AppResult<T> = Result<T, AppError>;
