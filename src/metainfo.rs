//! Torrent metainfo handling (BEP-3, BEP-9)
//!
//! Parses `.torrent` manifests and magnet links, and computes info hashes.

mod error;
mod info_hash;
mod magnet;
mod manifest;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub(crate) use info_hash::hex_encode;
pub use magnet::MagnetLink;
pub use manifest::Manifest;
