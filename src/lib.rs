//! Live TCP packet capture with address, port and control-flag filters.
//!
//! Frames flow one way through the crate, one at a time:
//! [`capture::source`] pulls a raw frame, [`capture::parser`] decodes the
//! IPv4 and TCP headers, [`models::filter::FilterSpec`] accepts or rejects
//! the packet and [`capture::renderer`] prints the accepted ones.
//! [`capture::manager::CaptureManager`] drives the whole loop.

pub mod capture;
pub mod models;
pub mod utils;

pub use utils::error::{AppError, AppResult};
