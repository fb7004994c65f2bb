//! Block types and piece/block arithmetic.
//!
//! Pieces are requested in fixed-size blocks; the scheduler fans block
//! requests out across peers and reassembles the returned blocks by offset.

use bytes::Bytes;

/// Standard block size (16 KiB).
pub const BLOCK_SIZE: u32 = 16 * 1024;

/// A request for a block of piece data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    /// The piece index.
    pub piece_index: u32,
    /// Byte offset within the piece.
    pub begin: u32,
    /// Length of the block in bytes.
    pub length: u32,
}

impl BlockRequest {
    pub fn new(piece_index: u32, begin: u32, length: u32) -> Self {
        Self {
            piece_index,
            begin,
            length,
        }
    }
}

/// A block of piece data received from a peer.
#[derive(Debug, Clone)]
pub struct Block {
    /// The piece index.
    pub piece_index: u32,
    /// Byte offset within the piece.
    pub begin: u32,
    /// The block data.
    pub data: Bytes,
}

/// Returns the number of blocks in a piece of the given length.
pub fn block_count(piece_length: u64) -> u32 {
    piece_length.div_ceil(BLOCK_SIZE as u64) as u32
}

/// Returns the length of the block starting at `begin` within a piece of the
/// given length. Every block is `BLOCK_SIZE` except possibly the last.
pub fn block_length(piece_length: u64, begin: u32) -> u32 {
    (piece_length - begin as u64).min(BLOCK_SIZE as u64) as u32
}
