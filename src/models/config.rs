use serde::Serialize;
use std::path::PathBuf;

/// Kernel-level pre-filter installed on every capture handle
pub const DEFAULT_BPF_FILTER: &str = "tcp";

/// Default snapshot length in bytes
pub const DEFAULT_SNAPLEN: i32 = 1600;

/// How accepted packets are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Separator-delimited blocks for humans
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Network interface to capture from; first device when unset
    pub interface: Option<String>,

    /// Enable promiscuous mode
    pub promiscuous: bool,

    /// Maximum bytes captured per frame
    pub snaplen: i32,

    /// Read timeout in milliseconds, 0 blocks until a frame arrives
    pub timeout_ms: i32,

    /// BPF filter expression installed in the driver
    pub filter: String,

    /// Replay this capture file instead of opening a device
    pub read_file: Option<PathBuf>,

    /// Stop after this many rendered packets, 0 for no limit
    pub count: u64,

    /// Output format
    pub output: OutputFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface: None,
            promiscuous: true,
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: 0,
            filter: DEFAULT_BPF_FILTER.to_string(),
            read_file: None,
            count: 0,
            output: OutputFormat::Text,
        }
    }
}
