use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Initialize the logger with custom formatting.
///
/// Logs always go to stderr so they never interleave with rendered packets
/// on stdout. `RUST_LOG`, when set, overrides `level` per module.
pub fn init_logger(level: LevelFilter) {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env()
        .target(Target::Stderr)
        .init();
}

/// Get log level from string
pub fn get_log_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}
