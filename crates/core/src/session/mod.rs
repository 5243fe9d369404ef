//! Remote session abstraction.
//!
//! This module provides a `TorrentSession` trait for reading torrent and file
//! state from a remote daemon, plus the Transmission RPC implementation.

mod transmission;
mod types;

pub use transmission::TransmissionSession;
pub use types::*;
