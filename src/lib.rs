//! skiff - a minimal BitTorrent v1 client
//!
//! Given a `.torrent` file or a magnet link, skiff discovers peers from an
//! HTTP tracker, establishes peer sessions, and downloads single pieces or
//! whole files, verifying each piece against its announced SHA1.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding
//! - [`metainfo`] - Torrent manifests, magnet links, info hashes
//! - [`tracker`] - BEP-3 HTTP tracker announces
//! - [`peer`] - BEP-3/10 peer wire protocol and BEP-9 metadata exchange
//! - [`download`] - Pipelined multi-peer piece downloads

pub mod bencode;
pub mod download;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use download::{DownloadError, Downloader};
pub use metainfo::{InfoHash, MagnetLink, Manifest, MetainfoError};
pub use peer::{Block, BlockRequest, Handshake, Message, PeerError, PeerId, PeerSession};
pub use tracker::{AnnounceResponse, HttpTracker, TrackerError};
