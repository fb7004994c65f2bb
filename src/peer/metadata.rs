//! Metadata exchange extension (ut_metadata, BEP-9).
//!
//! Magnet links carry only an info hash; the `info` dictionary itself is
//! fetched from a peer over this extension. A data message is a bencoded
//! header dictionary immediately followed by the raw metadata bytes.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::PeerError;
use crate::bencode::{decode_prefix, encode, Value};

/// Message types for the ut_metadata extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMessageType {
    /// Request a piece of metadata.
    Request = 0,
    /// Provide a piece of metadata.
    Data = 1,
    /// Reject a metadata request.
    Reject = 2,
}

impl MetadataMessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MetadataMessageType::Request),
            1 => Some(MetadataMessageType::Data),
            2 => Some(MetadataMessageType::Reject),
            _ => None,
        }
    }
}

/// A ut_metadata message.
#[derive(Debug, Clone)]
pub struct MetadataMessage {
    /// The message type (request, data, or reject).
    pub msg_type: MetadataMessageType,
    /// The metadata piece index.
    pub piece: u32,
    /// Total metadata size in bytes (data messages only).
    pub total_size: Option<u64>,
    /// The metadata bytes (data messages only).
    pub data: Option<Bytes>,
}

impl MetadataMessage {
    /// Creates a request for a metadata piece.
    pub fn request(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Request,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Encodes the message body (without the leading extension-id byte).
    pub fn encode(&self) -> Result<Bytes, PeerError> {
        let mut dict = BTreeMap::new();

        dict.insert(
            Bytes::from_static(b"msg_type"),
            Value::Integer(self.msg_type as i64),
        );
        dict.insert(
            Bytes::from_static(b"piece"),
            Value::Integer(self.piece as i64),
        );
        if let Some(total_size) = self.total_size {
            dict.insert(
                Bytes::from_static(b"total_size"),
                Value::Integer(total_size as i64),
            );
        }

        let mut encoded = encode(&Value::Dict(dict))?;
        if let Some(ref data) = self.data {
            encoded.extend_from_slice(data);
        }
        Ok(Bytes::from(encoded))
    }

    /// Decodes a message body (without the leading extension-id byte).
    ///
    /// For data messages the header dictionary announces `total_size`; the
    /// metadata is the final `total_size` bytes of the payload.
    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let (header, _) = decode_prefix(payload)?;
        let dict = header
            .as_dict()
            .ok_or_else(|| PeerError::Extension("expected dict".into()))?;

        let msg_type = dict
            .get(b"msg_type".as_slice())
            .and_then(|v| v.as_integer())
            .and_then(|v| MetadataMessageType::from_byte(v as u8))
            .ok_or_else(|| PeerError::Extension("missing msg_type".into()))?;

        let piece = dict
            .get(b"piece".as_slice())
            .and_then(|v| v.as_integer())
            .ok_or_else(|| PeerError::Extension("missing piece".into()))? as u32;

        let total_size = dict
            .get(b"total_size".as_slice())
            .and_then(|v| v.as_integer())
            .map(|v| v as u64);

        let data = match (msg_type, total_size) {
            (MetadataMessageType::Data, Some(size)) => {
                let size = size as usize;
                if size == 0 || size > payload.len() {
                    return Err(PeerError::Extension("bad total_size".into()));
                }
                Some(Bytes::copy_from_slice(&payload[payload.len() - size..]))
            }
            (MetadataMessageType::Data, None) => {
                return Err(PeerError::Extension("data without total_size".into()));
            }
            _ => None,
        };

        Ok(Self {
            msg_type,
            piece,
            total_size,
            data,
        })
    }
}
