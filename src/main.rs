use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, info};
use std::io::IsTerminal;
use std::path::PathBuf;
use termcolor::{ColorChoice, StandardStream};

use tcp_capture::capture::manager::CaptureManager;
use tcp_capture::capture::renderer::PacketRenderer;
use tcp_capture::capture::source::{self, FrameSource, PcapSource};
use tcp_capture::models::config::{AppConfig, OutputFormat, DEFAULT_BPF_FILTER, DEFAULT_SNAPLEN};
use tcp_capture::models::filter::FilterSpec;
use tcp_capture::models::flags::TcpFlag;
use tcp_capture::utils::args::{normalize_args, parse_address};
use tcp_capture::utils::logging;

/// When to color packet output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture TCP packets and show those matching address, port and flag filters",
    after_help = "Long options also work with a single dash, e.g. -from 10.0.0.5 -dport 443 -syn.\n\
                  Address and port filters must all match; flag filters match if any named flag is set."
)]
struct Args {
    /// Only show packets from this source IPv4 address
    #[arg(long = "from", value_name = "ADDR")]
    from: Option<String>,

    /// Only show packets to this destination IPv4 address
    #[arg(long = "to", value_name = "ADDR")]
    to: Option<String>,

    /// Only show packets from this source port (0 = any)
    #[arg(long, value_name = "PORT", default_value_t = 0)]
    sport: u16,

    /// Only show packets to this destination port (0 = any)
    #[arg(long, value_name = "PORT", default_value_t = 0)]
    dport: u16,

    /// Show SYN packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    syn: bool,

    /// Show ACK packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    ack: bool,

    /// Show FIN packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    fin: bool,

    /// Show PSH packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    psh: bool,

    /// Show RST packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    rst: bool,

    /// Show URG packets
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    urg: bool,

    /// Network interface to capture from (default: first device)
    #[arg(short, long)]
    interface: Option<String>,

    /// List capture devices and exit
    #[arg(long)]
    list_interfaces: bool,

    /// Maximum bytes captured per frame
    #[arg(long, default_value_t = DEFAULT_SNAPLEN)]
    snaplen: i32,

    /// Do not put the interface into promiscuous mode
    #[arg(long)]
    no_promisc: bool,

    /// Read timeout in milliseconds (0 = block until a frame arrives)
    #[arg(long, value_name = "MS", default_value_t = 0)]
    timeout: i32,

    /// Replay frames from a pcap file instead of a live device
    #[arg(long, value_name = "FILE")]
    read: Option<PathBuf>,

    /// Exit after this many packets are shown (0 = never)
    #[arg(short, long, default_value_t = 0)]
    count: u64,

    /// Print one JSON object per packet instead of text blocks
    #[arg(long)]
    json: bool,

    /// Color packet output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    /// Build the packet filter; fails on a malformed address
    fn filter_spec(&self) -> Result<FilterSpec> {
        let source_address = parse_address(self.from.as_deref().unwrap_or_default())
            .context("bad -from value")?;
        let dest_address =
            parse_address(self.to.as_deref().unwrap_or_default()).context("bad -to value")?;

        Ok(FilterSpec::builder()
            .source_address(source_address)
            .dest_address(dest_address)
            .source_port(self.sport)
            .dest_port(self.dport)
            .flag(TcpFlag::Syn, self.syn)
            .flag(TcpFlag::Ack, self.ack)
            .flag(TcpFlag::Fin, self.fin)
            .flag(TcpFlag::Psh, self.psh)
            .flag(TcpFlag::Rst, self.rst)
            .flag(TcpFlag::Urg, self.urg)
            .build())
    }

    fn app_config(&self) -> AppConfig {
        AppConfig {
            interface: self.interface.clone(),
            promiscuous: !self.no_promisc,
            snaplen: self.snaplen,
            timeout_ms: self.timeout,
            filter: DEFAULT_BPF_FILTER.to_string(),
            read_file: self.read.clone(),
            count: self.count,
            output: if self.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        }
    }

    fn color_choice(&self) -> ColorChoice {
        match self.color {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    logging::init_logger(logging::get_log_level(&args.log_level));
    info!("Starting tcp-capture v{}", env!("CARGO_PKG_VERSION"));

    if args.list_interfaces {
        return print_interfaces();
    }

    let filter = args.filter_spec()?;
    let config = args.app_config();
    debug!("Configuration: {}", serde_json::to_string(&config)?);
    debug!("Packet filter: {:?}", filter);

    let source = PcapSource::open(&config).context("capture initialization failed")?;
    info!("Capturing from {} ({:?})", source.name(), source.link_type());

    let mut stdout = StandardStream::stdout(args.color_choice());
    let renderer = PacketRenderer::new(config.output);
    let mut manager = CaptureManager::new(source, filter, renderer).with_limit(config.count);
    let stats = manager
        .run_with_banner(&mut stdout)
        .context("capture failed")?;
    info!("Capture finished: {}", stats.summary());

    Ok(())
}

/// Print every capture device, one per line
fn print_interfaces() -> Result<()> {
    let interfaces = source::list_interfaces().context("failed to list interfaces")?;
    if interfaces.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }

    println!(
        "{:<16} {:<16} {:<18} {:<10} {}",
        "Name", "IPv4", "MAC", "State", "Description"
    );
    println!("{}", "-".repeat(80));
    for interface in &interfaces {
        println!("{}", interface);
    }
    Ok(())
}
