use chrono::Utc;
use log::{debug, info, log_enabled, trace, Level};
use std::io::{self, ErrorKind};
use termcolor::WriteColor;

use crate::capture::parser::PacketParser;
use crate::capture::renderer::PacketRenderer;
use crate::capture::source::FrameSource;
use crate::models::filter::FilterSpec;
use crate::models::stats::CaptureStats;
use crate::utils::error::{AppError, AppResult};

/// Lifecycle of a capture run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Source opened, loop not started
    Initializing,
    /// Pulling frames
    Running,
    /// Loop finished; the source is released when the manager is dropped
    Terminated,
}

/// Runs the capture loop: pull, decode, filter, render
///
/// Frames are handled one at a time in the order the source delivers them.
/// Nothing about a frame survives its iteration except the counters in
/// [`CaptureStats`].
pub struct CaptureManager<S: FrameSource> {
    /// Where frames come from
    source: S,

    /// Decoder matching the source's link type
    parser: PacketParser,

    /// Immutable filter built at startup
    filter: FilterSpec,

    /// Output formatting
    renderer: PacketRenderer,

    /// Stop after this many rendered packets
    limit: Option<u64>,

    /// Capture statistics
    stats: CaptureStats,

    state: CaptureState,
}

impl<S: FrameSource> CaptureManager<S> {
    /// Create a new capture manager
    pub fn new(source: S, filter: FilterSpec, renderer: PacketRenderer) -> Self {
        let parser = PacketParser::new(source.link_type());
        Self {
            source,
            parser,
            filter,
            renderer,
            limit: None,
            stats: CaptureStats::default(),
            state: CaptureState::Initializing,
        }
    }

    /// Stop after `count` rendered packets; 0 means no limit
    pub fn with_limit(mut self, count: u64) -> Self {
        self.limit = (count != 0).then_some(count);
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Print the filter banner, then [`run`](Self::run) the loop.
    ///
    /// A reader that has already gone away when the banner is written ends
    /// the capture the same way it does mid-loop: cleanly, with no frames read.
    pub fn run_with_banner<W: WriteColor + ?Sized>(
        &mut self,
        out: &mut W,
    ) -> AppResult<CaptureStats> {
        let banner = self.renderer.write_banner(out, &self.filter);
        if output_closed(banner)? {
            self.state = CaptureState::Terminated;
            return Ok(self.stats.clone());
        }
        self.run(out)
    }

    /// Run the loop until the source is exhausted, the packet limit is hit
    /// or `out` is closed.
    ///
    /// Frames that do not decode and packets the filter rejects produce no
    /// output. Read errors from the source and write errors other than a
    /// broken pipe end the loop with an error.
    pub fn run<W: WriteColor + ?Sized>(&mut self, out: &mut W) -> AppResult<CaptureStats> {
        self.state = CaptureState::Running;
        self.stats.start_time = Some(Utc::now());
        info!("Starting capture loop (link type {:?})", self.parser.link_type());

        let result = loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Capture source closed");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };
            self.stats.frames_received += 1;
            self.stats.bytes_received += frame.len() as u64;

            let packet = match self.parser.parse_packet(frame) {
                Ok(packet) => packet,
                Err(e) => {
                    self.stats.frames_skipped += 1;
                    trace!("Skipping frame of {} bytes: {}", frame.len(), e);
                    continue;
                }
            };
            self.stats.frames_decoded += 1;

            if !self.filter.accepts(&packet) {
                self.stats.packets_rejected += 1;
                continue;
            }
            self.stats.packets_accepted += 1;

            if log_enabled!(Level::Debug) {
                debug!(
                    "Accepted {} {} -> {} ({} payload bytes)",
                    packet.flags,
                    packet.source(),
                    packet.destination(),
                    packet.payload.len()
                );
            }

            match output_closed(self.renderer.render(out, &packet)) {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self
                .limit
                .is_some_and(|limit| self.stats.packets_accepted >= limit)
            {
                info!("Reached limit of {} packets", self.stats.packets_accepted);
                break Ok(());
            }
        };

        self.state = CaptureState::Terminated;
        self.stats.end_time = Some(Utc::now());
        info!("Capture loop stopped");

        result.map(|()| self.stats.clone())
    }
}

/// True when a write failed because stdout was closed; other failures are errors
fn output_closed(result: io::Result<()>) -> AppResult<bool> {
    match result {
        Ok(()) => Ok(false),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            info!("Output closed, stopping capture");
            Ok(true)
        }
        Err(e) => Err(AppError::Io(e)),
    }
}
