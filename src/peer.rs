//! Peer wire protocol (BEP-3, BEP-9, BEP-10)
//!
//! This module implements the BitTorrent peer wire protocol: the 68-byte
//! handshake, length-prefixed messages, the per-connection session state
//! machine, and the extension protocol with metadata exchange.

mod error;
mod extension;
mod message;
mod metadata;
mod peer_id;
mod piece;
mod session;
mod transport;

pub use error::PeerError;
pub use extension::ExtensionHandshake;
pub use message::{Handshake, Message, MessageId};
pub use metadata::MetadataMessage;
pub use peer_id::PeerId;
pub use piece::{block_count, block_length, Block, BlockRequest, BLOCK_SIZE};
pub use session::PeerSession;
pub use transport::PeerTransport;
