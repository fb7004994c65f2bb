//! Pipelined multi-peer piece downloads.
//!
//! One download owns a set of prepared peer sessions (all past unchoke).
//! For each piece, block requests are fanned out over a task channel to one
//! worker per session; each worker keeps up to five requests in flight and
//! pushes returned blocks to a results channel. The first worker error
//! cancels the rest; blocks are reassembled by offset and the piece is
//! verified against its announced SHA1 before it is accepted.

use std::sync::Arc;

use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metainfo::Manifest;
use crate::peer::{block_count, block_length, Block, BlockRequest, PeerError, PeerSession, BLOCK_SIZE};

/// Maximum outstanding requests per peer (the pipelining window).
const MAX_INFLIGHT: usize = 5;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("piece {0} failed integrity check")]
    Integrity(u32),

    #[error("unexpected block for piece {piece} at offset {begin}")]
    BadBlock { piece: u32, begin: u32 },

    #[error("piece index {0} out of range")]
    InvalidPiece(u32),

    #[error("no peers available")]
    NoPeers,

    #[error("missing blocks after workers finished")]
    MissingBlocks,

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// A sibling worker failed first; the scheduler reports that first
    /// error, and this one is suppressed.
    #[error("cancelled")]
    Cancelled,
}

impl DownloadError {
    fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

/// Downloads pieces from a set of prepared peer sessions.
///
/// Every session handed in must already be past the unchoke exchange; the
/// downloader only issues requests and reads piece messages. Sessions are
/// reused across pieces and released with [`into_sessions`](Self::into_sessions).
pub struct Downloader {
    manifest: Manifest,
    sessions: Vec<PeerSession>,
}

impl Downloader {
    pub fn new(manifest: Manifest, sessions: Vec<PeerSession>) -> Self {
        Self { manifest, sessions }
    }

    /// Downloads and verifies a single piece.
    pub async fn download_piece(&mut self, piece_index: u32) -> Result<Vec<u8>, DownloadError> {
        if piece_index as usize >= self.manifest.piece_count() {
            return Err(DownloadError::InvalidPiece(piece_index));
        }
        if self.sessions.is_empty() {
            return Err(DownloadError::NoPeers);
        }

        let piece_length = self.manifest.piece_size(piece_index);
        let blocks = block_count(piece_length) as usize;

        let (task_tx, task_rx) = mpsc::channel::<BlockRequest>(blocks.max(1));
        let (result_tx, mut result_rx) = mpsc::channel::<Block>(blocks.max(1));
        let task_rx = Arc::new(AsyncMutex::new(task_rx));
        let cancel = CancellationToken::new();
        let cause: Arc<Mutex<Option<DownloadError>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(self.sessions.len());
        for session in self.sessions.drain(..) {
            handles.push(tokio::spawn(run_worker(
                session,
                Arc::clone(&task_rx),
                result_tx.clone(),
                cancel.clone(),
                Arc::clone(&cause),
            )));
        }
        drop(result_tx);

        // Producer: every block request in offset order, then close the
        // channel so workers drain out.
        for i in 0..blocks as u32 {
            let begin = i * BLOCK_SIZE;
            let request =
                BlockRequest::new(piece_index, begin, block_length(piece_length, begin));

            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = task_tx.send(request) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(task_tx);

        for handle in handles {
            let session = handle.await?;
            self.sessions.push(session);
        }

        if let Some(err) = cause.lock().take() {
            return Err(err);
        }

        // All workers succeeded, so exactly `blocks` results are buffered.
        let mut piece_data = vec![0u8; piece_length as usize];
        for _ in 0..blocks {
            let block = result_rx.recv().await.ok_or(DownloadError::MissingBlocks)?;
            let begin = block.begin as usize;
            let end = begin + block.data.len();

            if block.piece_index != piece_index || end > piece_data.len() {
                return Err(DownloadError::BadBlock {
                    piece: block.piece_index,
                    begin: block.begin,
                });
            }
            piece_data[begin..end].copy_from_slice(&block.data);
        }

        let mut hasher = Sha1::new();
        hasher.update(&piece_data);
        let hash: [u8; 20] = hasher.finalize().into();

        if hash != self.manifest.piece_hashes[piece_index as usize] {
            return Err(DownloadError::Integrity(piece_index));
        }

        debug!(piece = piece_index, bytes = piece_data.len(), "piece verified");

        Ok(piece_data)
    }

    /// Downloads the whole file, piece by piece in order.
    pub async fn download(&mut self) -> Result<Vec<u8>, DownloadError> {
        let mut output = vec![0u8; self.manifest.length as usize];

        for index in 0..self.manifest.piece_count() as u32 {
            let piece = self.download_piece(index).await?;
            let start = index as usize * self.manifest.piece_length as usize;
            output[start..start + piece.len()].copy_from_slice(&piece);
        }

        Ok(output)
    }

    /// Releases the session set.
    pub fn into_sessions(self) -> Vec<PeerSession> {
        self.sessions
    }
}

// Wraps the worker loop so the session survives for reuse and the first
// error lands in the cause slot, cancelling the siblings.
async fn run_worker(
    mut session: PeerSession,
    tasks: Arc<AsyncMutex<mpsc::Receiver<BlockRequest>>>,
    results: mpsc::Sender<Block>,
    cancel: CancellationToken,
    cause: Arc<Mutex<Option<DownloadError>>>,
) -> PeerSession {
    if let Err(err) = worker_loop(&mut session, &tasks, &results, &cancel).await {
        if !err.is_cancelled() {
            warn!(addr = %session.addr(), error = %err, "peer worker failed");
            let mut slot = cause.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
        cancel.cancel();
    }
    session
}

async fn worker_loop(
    session: &mut PeerSession,
    tasks: &AsyncMutex<mpsc::Receiver<BlockRequest>>,
    results: &mpsc::Sender<Block>,
    cancel: &CancellationToken,
) -> Result<(), DownloadError> {
    let mut in_flight = 0usize;
    let mut drained = false;

    loop {
        if in_flight < MAX_INFLIGHT && !drained {
            let task = {
                let mut rx = tasks.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                    task = rx.recv() => task,
                }
            };

            match task {
                Some(request) => {
                    session
                        .request(request.piece_index, request.begin, request.length)
                        .await?;
                    in_flight += 1;
                }
                None => drained = true,
            }
        } else if in_flight > 0 {
            let block = tokio::select! {
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                block = session.read_piece() => block?,
            };

            in_flight -= 1;
            if results.send(block).await.is_err() {
                return Err(DownloadError::Cancelled);
            }
        } else {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_layout_for_last_piece() {
        // length 1_000_000, piece length 262_144: last piece is 213_568.
        let piece_length = 1_000_000u64 - 3 * 262_144;
        assert_eq!(piece_length, 213_568);
        assert_eq!(block_count(piece_length), 14);
        assert_eq!(block_length(piece_length, 0), BLOCK_SIZE);
        assert_eq!(block_length(piece_length, 13 * BLOCK_SIZE), 7_168);
    }

    #[test]
    fn cancelled_errors_are_marked() {
        assert!(DownloadError::Cancelled.is_cancelled());
        assert!(!DownloadError::Integrity(0).is_cancelled());
    }
}
