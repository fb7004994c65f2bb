//! Bencode encoding and decoding (BEP-3)
//!
//! Bencode is BitTorrent's self-describing binary encoding. It carries the
//! `.torrent` metainfo, tracker responses, and extension-protocol payloads.

mod decode;
mod encode;
mod error;
mod json;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;

#[cfg(test)]
mod tests;
