use super::error::PeerError;
use crate::bencode::{decode, encode, Value};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Extension id zero is the extension handshake itself (BEP-10).
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// The extension id we advertise for ut_metadata in our handshake.
pub const LOCAL_UT_METADATA_ID: u8 = 1;

/// A BEP-10 extension handshake.
///
/// The `m` dictionary maps extension names to the message ids the sender
/// wants them addressed by. Canonical bencoding keeps multi-key `m` dicts
/// stable on the wire.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHandshake {
    pub extensions: BTreeMap<String, u8>,
    pub metadata_size: Option<i64>,
}

impl ExtensionHandshake {
    /// Creates the handshake this client sends: ut_metadata only.
    pub fn local() -> Self {
        let mut hs = Self::default();
        hs.extensions
            .insert("ut_metadata".to_string(), LOCAL_UT_METADATA_ID);
        hs
    }

    /// Encodes to a bencoded dictionary (without the leading extension-id
    /// byte).
    pub fn encode(&self) -> Result<Bytes, PeerError> {
        let mut m = BTreeMap::new();
        for (name, id) in &self.extensions {
            m.insert(
                Bytes::copy_from_slice(name.as_bytes()),
                Value::Integer(*id as i64),
            );
        }

        let mut dict = BTreeMap::new();
        dict.insert(Bytes::from_static(b"m"), Value::Dict(m));

        if let Some(size) = self.metadata_size {
            dict.insert(Bytes::from_static(b"metadata_size"), Value::Integer(size));
        }

        Ok(Bytes::from(encode(&Value::Dict(dict))?))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        let value = decode(data)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| PeerError::Extension("expected dict".into()))?;

        let mut hs = Self::default();

        if let Some(m) = dict.get(b"m".as_slice()).and_then(|v| v.as_dict()) {
            for (key, val) in m {
                if let (Ok(name), Some(id)) = (std::str::from_utf8(key), val.as_integer()) {
                    if id > 0 {
                        hs.extensions.insert(name.to_string(), id as u8);
                    }
                }
            }
        }

        hs.metadata_size = dict
            .get(b"metadata_size".as_slice())
            .and_then(|v| v.as_integer());

        Ok(hs)
    }

    /// Returns the peer's message id for the named extension.
    pub fn extension_id(&self, name: &str) -> Option<u8> {
        self.extensions.get(name).copied()
    }
}
