use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};

/// A parsed torrent manifest.
///
/// Immutable after construction. Only single-file torrents are supported:
/// the `info` dictionary must carry a `length` key.
///
/// # Examples
///
/// ```no_run
/// use skiff::metainfo::Manifest;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("example.torrent")?;
/// let manifest = Manifest::from_bytes(&data)?;
///
/// println!("Tracker: {}", manifest.tracker_url);
/// println!("Info hash: {}", manifest.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Announce URL of the HTTP tracker.
    pub tracker_url: String,
    /// Total size of the file in bytes.
    pub length: u64,
    /// Number of bytes per piece; the last piece may be shorter.
    pub piece_length: u64,
    /// SHA1 of the canonical bencoding of the `info` dictionary.
    pub info_hash: InfoHash,
    /// SHA1 of each piece, in piece order.
    pub piece_hashes: Vec<[u8; 20]>,
}

impl Manifest {
    /// Parses a `.torrent` file from raw bytes.
    ///
    /// The info hash is computed over the canonical re-encoding of the
    /// `info` value, which matches the file bytes whenever the file itself
    /// is canonically encoded (they almost always are).
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid bencode, required fields
    /// are missing (`announce`, `info`, `length`, `piece length`, `pieces`),
    /// or the `pieces` length is not a multiple of 20.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let tracker_url = dict
            .get(b"announce".as_slice())
            .and_then(|v| v.as_str())
            .ok_or(MetainfoError::MissingField("announce"))?
            .to_string();

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;

        let info_hash = InfoHash::from_info_bytes(&encode(info_value)?);

        Self::from_parts(tracker_url, info_hash, info_value)
    }

    /// Builds a manifest from raw `info` dictionary bytes, as fetched from a
    /// peer over the metadata extension.
    ///
    /// The hash is computed over the bytes exactly as received; the caller
    /// compares it against the magnet link's hash.
    pub fn from_info_bytes(tracker_url: &str, info_bytes: &[u8]) -> Result<Self, MetainfoError> {
        let info_hash = InfoHash::from_info_bytes(info_bytes);
        let info_value = decode(info_bytes)?;
        Self::from_parts(tracker_url.to_string(), info_hash, &info_value)
    }

    fn from_parts(
        tracker_url: String,
        info_hash: InfoHash,
        info_value: &Value,
    ) -> Result<Self, MetainfoError> {
        let info = info_value
            .as_dict()
            .ok_or(MetainfoError::InvalidField("info"))?;

        let length = info
            .get(b"length".as_slice())
            .and_then(|v| v.as_integer())
            .ok_or(MetainfoError::MissingField("length"))? as u64;

        let piece_length = info
            .get(b"piece length".as_slice())
            .and_then(|v| v.as_integer())
            .filter(|&n| n > 0)
            .ok_or(MetainfoError::MissingField("piece length"))? as u64;

        let pieces_bytes = info
            .get(b"pieces".as_slice())
            .and_then(|v| v.as_bytes())
            .ok_or(MetainfoError::MissingField("pieces"))?;

        if pieces_bytes.len() % 20 != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }

        let piece_hashes = pieces_bytes
            .chunks_exact(20)
            .map(|chunk| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();

        Ok(Self {
            tracker_url,
            length,
            piece_length,
            info_hash,
            piece_hashes,
        })
    }

    /// Returns the number of pieces.
    pub fn piece_count(&self) -> usize {
        self.piece_hashes.len()
    }

    /// Returns the size in bytes of the given piece.
    ///
    /// Every piece is `piece_length` bytes except possibly the last.
    pub fn piece_size(&self, index: u32) -> u64 {
        (self.length - self.piece_length * index as u64).min(self.piece_length)
    }
}
