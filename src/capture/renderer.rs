//! Packet rendering for stdout.
//!
//! Text records look like this, one block per accepted packet:
//!
//! ```text
//!
//! ==================================================
//! [PSH ACK] 10.0.0.5:51000 -> 10.0.0.1:80
//! Payload:
//!
//! GET / HTTP/1.1
//!
//! ==================================================
//! ```
//!
//! Payload bytes are written exactly as captured. Nothing is escaped, so
//! binary payloads can garble the terminal.

use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::models::config::OutputFormat;
use crate::models::filter::FilterSpec;
use crate::models::packet::{DecodedPacket, PacketRecord};

/// Width of the `=` separator lines
pub const SEPARATOR_WIDTH: usize = 50;

/// Writes accepted packets in the configured format
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketRenderer {
    format: OutputFormat,
}

impl PacketRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render one packet and flush
    pub fn render<W: WriteColor + ?Sized>(
        &self,
        out: &mut W,
        packet: &DecodedPacket<'_>,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => render_text(out, packet)?,
            OutputFormat::Json => render_json(out, packet)?,
        }
        out.flush()
    }

    /// Print the startup banner describing the active filter
    pub fn write_banner<W: Write + ?Sized>(&self, out: &mut W, filter: &FilterSpec) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return Ok(());
        }

        writeln!(out, "Starting packet capture...")?;
        if let Some(address) = filter.source_address() {
            writeln!(out, "Filtering source IP: {}", address)?;
        }
        if let Some(address) = filter.dest_address() {
            writeln!(out, "Filtering destination IP: {}", address)?;
        }
        if let Some(port) = filter.source_port() {
            writeln!(out, "Filtering source port: {}", port)?;
        }
        if let Some(port) = filter.dest_port() {
            writeln!(out, "Filtering destination port: {}", port)?;
        }
        if !filter.required_flags().is_empty() {
            writeln!(out, "Filtering flags: {}", filter.required_flags())?;
        }
        out.flush()
    }
}

fn render_text<W: WriteColor + ?Sized>(out: &mut W, packet: &DecodedPacket<'_>) -> io::Result<()> {
    writeln!(out)?;
    write_separator(out)?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(out, "{}", packet.flags)?;
    out.reset()?;
    writeln!(out, " {} -> {}", packet.source(), packet.destination())?;

    if !packet.payload.is_empty() {
        writeln!(out, "Payload:")?;
        writeln!(out)?;
        out.write_all(packet.payload)?;
        writeln!(out)?;
        writeln!(out)?;
    }

    write_separator(out)
}

fn write_separator<W: WriteColor + ?Sized>(out: &mut W) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
    write!(out, "{}", "=".repeat(SEPARATOR_WIDTH))?;
    out.reset()?;
    writeln!(out)
}

fn render_json<W: Write + ?Sized>(out: &mut W, packet: &DecodedPacket<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, &PacketRecord::from(packet))?;
    writeln!(out)
}
