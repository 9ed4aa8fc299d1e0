use chrono::{DateTime, Utc};

/// Counters kept by the capture loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames pulled from the capture source
    pub frames_received: u64,

    /// Bytes pulled from the capture source
    pub bytes_received: u64,

    /// Frames that decoded to an IPv4 TCP segment
    pub frames_decoded: u64,

    /// Frames skipped as not decodable
    pub frames_skipped: u64,

    /// Decoded packets the filter accepted
    pub packets_accepted: u64,

    /// Decoded packets the filter rejected
    pub packets_rejected: u64,

    /// Capture start time
    pub start_time: Option<DateTime<Utc>>,

    /// Capture end time (if stopped)
    pub end_time: Option<DateTime<Utc>>,
}

impl CaptureStats {
    /// Seconds between start and end, if both are known
    pub fn elapsed_secs(&self) -> Option<f64> {
        let (start, end) = (self.start_time?, self.end_time?);
        Some(end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0)
    }

    /// One-line summary for the log
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} frames ({} bytes): {} decoded, {} skipped, {} shown, {} filtered out",
            self.frames_received,
            self.bytes_received,
            self.frames_decoded,
            self.frames_skipped,
            self.packets_accepted,
            self.packets_rejected
        );
        if let Some(secs) = self.elapsed_secs() {
            line.push_str(&format!(" in {:.1}s", secs));
        }
        line
    }
}
