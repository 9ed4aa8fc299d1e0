pub mod config;
pub mod filter;
pub mod flags;
pub mod interface;
pub mod packet;
pub mod stats;
