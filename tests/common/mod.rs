//! In-process stubs for exercising the client end to end.
//!
//! The stub peer and tracker speak raw wire bytes rather than going through
//! the crate's own codecs, so a codec bug cannot cancel itself out.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const PROTOCOL: &[u8] = b"BitTorrent protocol";

/// The extension id the stub assigns to ut_metadata. Deliberately not 1, so
/// a client that ignores the negotiated id fails the tests.
pub const STUB_UT_METADATA_ID: u8 = 16;

#[derive(Clone)]
pub struct StubPeerConfig {
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
    /// Advertise the extension protocol in the handshake.
    pub extensions: bool,
    /// Full piece bytes by piece index.
    pub pieces: HashMap<u32, Vec<u8>>,
    /// Raw `info` dictionary bytes served over ut_metadata.
    pub metadata: Option<Vec<u8>>,
    /// Hold pairs of requests and answer them in reverse order.
    pub out_of_order: bool,
    /// Flip a byte in every served block.
    pub corrupt: bool,
    pub num_pieces: usize,
}

impl StubPeerConfig {
    pub fn new(info_hash: [u8; 20], num_pieces: usize) -> Self {
        let mut peer_id = [0u8; 20];
        peer_id[..8].copy_from_slice(b"-ST0001-");
        for (i, byte) in peer_id[8..].iter_mut().enumerate() {
            *byte = i as u8;
        }

        Self {
            info_hash,
            peer_id,
            extensions: false,
            pieces: HashMap::new(),
            metadata: None,
            out_of_order: false,
            corrupt: false,
            num_pieces,
        }
    }

    pub fn with_piece(mut self, index: u32, data: Vec<u8>) -> Self {
        self.pieces.insert(index, data);
        self
    }

    pub fn with_extensions(mut self) -> Self {
        self.extensions = true;
        self
    }

    pub fn with_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.extensions = true;
        self.metadata = Some(metadata);
        self
    }

    pub fn out_of_order(mut self) -> Self {
        self.out_of_order = true;
        self
    }

    pub fn corrupt(mut self) -> Self {
        self.corrupt = true;
        self
    }
}

/// A loopback peer that serves pieces for one torrent.
pub struct StubPeer {
    addr: SocketAddr,
}

impl StubPeer {
    /// Binds a listener and starts accepting connections in the background.
    pub async fn start(config: StubPeerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let config = Arc::new(config);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, &config).await;
                });
            }
        });

        Ok(Self { addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    config: &StubPeerConfig,
) -> std::io::Result<()> {
    // Handshake: read theirs, verify the hash, send ours.
    let mut handshake = [0u8; 68];
    stream.read_exact(&mut handshake).await?;
    assert_eq!(handshake[0], 19);
    assert_eq!(&handshake[1..20], PROTOCOL);
    assert_eq!(&handshake[28..48], &config.info_hash);

    let mut reply = Vec::with_capacity(68);
    reply.push(19);
    reply.extend_from_slice(PROTOCOL);
    let mut reserved = [0u8; 8];
    if config.extensions {
        reserved[5] |= 0x10;
    }
    reply.extend_from_slice(&reserved);
    reply.extend_from_slice(&config.info_hash);
    reply.extend_from_slice(&config.peer_id);
    stream.write_all(&reply).await?;

    // Bitfield straight after the handshake, all pieces set.
    let bitfield = vec![0xffu8; config.num_pieces.div_ceil(8)];
    send_frame(&mut stream, 5, &bitfield).await?;

    let mut pending_requests: Vec<(u32, u32, u32)> = Vec::new();

    loop {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 {
            continue; // keep-alive
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;
        let id = body[0];
        let payload = &body[1..];

        match id {
            2 => {
                // interested -> unchoke
                send_frame(&mut stream, 1, &[]).await?;
            }
            6 => {
                let index = u32::from_be_bytes(payload[0..4].try_into().unwrap());
                let begin = u32::from_be_bytes(payload[4..8].try_into().unwrap());
                let length = u32::from_be_bytes(payload[8..12].try_into().unwrap());

                if config.out_of_order {
                    pending_requests.push((index, begin, length));
                    if pending_requests.len() == 2 {
                        for &(index, begin, length) in pending_requests.iter().rev() {
                            serve_block(&mut stream, config, index, begin, length).await?;
                        }
                        pending_requests.clear();
                    }
                } else {
                    serve_block(&mut stream, config, index, begin, length).await?;
                }
            }
            20 => {
                handle_extended(&mut stream, config, payload).await?;
            }
            _ => {}
        }
    }
}

async fn serve_block(
    stream: &mut TcpStream,
    config: &StubPeerConfig,
    index: u32,
    begin: u32,
    length: u32,
) -> std::io::Result<()> {
    let piece = config.pieces.get(&index).expect("stub has no such piece");
    let mut block = piece[begin as usize..(begin + length) as usize].to_vec();
    if config.corrupt {
        block[0] ^= 0xff;
    }

    let mut payload = Vec::with_capacity(8 + block.len());
    payload.extend_from_slice(&index.to_be_bytes());
    payload.extend_from_slice(&begin.to_be_bytes());
    payload.extend_from_slice(&block);
    send_frame(stream, 7, &payload).await
}

async fn handle_extended(
    stream: &mut TcpStream,
    config: &StubPeerConfig,
    payload: &[u8],
) -> std::io::Result<()> {
    let metadata = config.metadata.as_ref().expect("stub has no metadata");

    if payload[0] == 0 {
        // Extension handshake: advertise ut_metadata under our id.
        let body = format!(
            "d1:md11:ut_metadatai{}ee13:metadata_sizei{}ee",
            STUB_UT_METADATA_ID,
            metadata.len()
        );
        send_extended(stream, 0, body.as_bytes()).await
    } else {
        // Metadata request; the stub serves everything as piece 0.
        assert_eq!(payload[0], STUB_UT_METADATA_ID);
        let mut body = format!(
            "d8:msg_typei1e5:piecei0e10:total_sizei{}ee",
            metadata.len()
        )
        .into_bytes();
        body.extend_from_slice(metadata);
        send_extended(stream, STUB_UT_METADATA_ID, &body).await
    }
}

async fn send_frame(stream: &mut TcpStream, id: u8, payload: &[u8]) -> std::io::Result<()> {
    let mut frame = Vec::with_capacity(5 + payload.len());
    frame.extend_from_slice(&(1 + payload.len() as u32).to_be_bytes());
    frame.push(id);
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await
}

async fn send_extended(
    stream: &mut TcpStream,
    ext_id: u8,
    payload: &[u8],
) -> std::io::Result<()> {
    let mut body = Vec::with_capacity(1 + payload.len());
    body.push(ext_id);
    body.extend_from_slice(payload);
    send_frame(stream, 20, &body).await
}

/// A one-shot HTTP tracker: answers a single announce with the given peers
/// and hands the raw query string back for assertions.
pub struct StubTracker {
    pub url: String,
    pub query: oneshot::Receiver<String>,
}

impl StubTracker {
    pub async fn start(peers: Vec<SocketAddr>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/announce", listener.local_addr()?);
        let (query_tx, query) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let Ok(n) = stream.read(&mut buf).await else {
                    return;
                };
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let request = String::from_utf8_lossy(&request).into_owned();
            let query_string = request
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|path| path.split_once('?'))
                .map(|(_, q)| q.to_string())
                .unwrap_or_default();
            let _ = query_tx.send(query_string);

            let mut compact = Vec::with_capacity(peers.len() * 6);
            for peer in &peers {
                match peer {
                    SocketAddr::V4(v4) => {
                        compact.extend_from_slice(&v4.ip().octets());
                        compact.extend_from_slice(&v4.port().to_be_bytes());
                    }
                    SocketAddr::V6(_) => panic!("stub tracker is IPv4 only"),
                }
            }

            let mut body = format!("d8:intervali1800e5:peers{}:", compact.len()).into_bytes();
            body.extend_from_slice(&compact);
            body.push(b'e');

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.write_all(&body).await;
        });

        Ok(Self { url, query })
    }
}

/// Deterministic piece bytes: a seeded byte ramp.
pub fn make_piece(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Bencodes a single-file `info` dictionary.
pub fn build_info_bytes(length: u64, piece_length: u64, piece_hashes: &[[u8; 20]]) -> Vec<u8> {
    let mut info = format!(
        "d6:lengthi{}e4:name8:test.bin12:piece lengthi{}e6:pieces{}:",
        length,
        piece_length,
        piece_hashes.len() * 20
    )
    .into_bytes();
    for hash in piece_hashes {
        info.extend_from_slice(hash);
    }
    info.push(b'e');
    info
}

/// Bencodes a whole `.torrent` file around the given `info` dictionary.
pub fn build_torrent(announce: &str, info_bytes: &[u8]) -> Vec<u8> {
    let mut data = format!("d8:announce{}:{}4:info", announce.len(), announce).into_bytes();
    data.extend_from_slice(info_bytes);
    data.push(b'e');
    data
}
