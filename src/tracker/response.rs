use super::error::TrackerError;
use crate::bencode::decode;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// A parsed tracker announce response.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// Seconds the tracker asks us to wait between announces.
    pub interval: Option<u32>,
    /// Peer addresses from the compact `peers` field.
    pub peers: Vec<SocketAddr>,
}

impl AnnounceResponse {
    /// Parses a bencoded announce response body.
    ///
    /// A `failure reason` key turns into [`TrackerError::Failure`]. The
    /// `peers` field must be a byte string packing six bytes per peer:
    /// four IPv4 octets and a big-endian port.
    pub fn from_bencode(body: &[u8]) -> Result<Self, TrackerError> {
        let value = decode(body)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| TrackerError::InvalidResponse("expected dict".into()))?;

        if let Some(reason) = dict
            .get(b"failure reason".as_slice())
            .and_then(|v| v.as_str())
        {
            return Err(TrackerError::Failure(reason.to_string()));
        }

        let interval = dict
            .get(b"interval".as_slice())
            .and_then(|v| v.as_integer())
            .map(|v| v as u32);

        let compact = dict
            .get(b"peers".as_slice())
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| TrackerError::InvalidResponse("missing peers".into()))?;

        if compact.len() % 6 != 0 {
            return Err(TrackerError::InvalidResponse(format!(
                "peers length {} is not a multiple of 6",
                compact.len()
            )));
        }

        Ok(Self {
            interval,
            peers: parse_compact_peers(compact),
        })
    }
}

/// Parses the compact peers encoding: 4 IPv4 octets + big-endian port per
/// record.
pub fn parse_compact_peers(data: &[u8]) -> Vec<SocketAddr> {
    data.chunks_exact(6)
        .map(|record| {
            let ip = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
            let port = u16::from_be_bytes([record[4], record[5]]);
            SocketAddr::new(IpAddr::V4(ip), port)
        })
        .collect()
}
