use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skiff::download::Downloader;
use skiff::metainfo::{InfoHash, MagnetLink, Manifest};
use skiff::peer::{PeerId, PeerSession};
use skiff::tracker::HttpTracker;

// What a magnet announce reports as `left` before the length is known.
const MAGNET_LEFT: u64 = 1;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
#[clap(rename_all = "snake_case")]
enum Command {
    /// Decode a bencoded value and print it as JSON.
    Decode { value: String },
    /// Print the metadata of a torrent file.
    Info { torrent: PathBuf },
    /// Print the peers the tracker reports for a torrent.
    Peers { torrent: PathBuf },
    /// Handshake with one peer and print its peer id.
    Handshake { torrent: PathBuf, peer: SocketAddr },
    /// Download a single piece.
    DownloadPiece {
        #[arg(short)]
        output: PathBuf,
        torrent: PathBuf,
        piece: u32,
    },
    /// Download the whole file.
    Download {
        #[arg(short)]
        output: PathBuf,
        torrent: PathBuf,
    },
    /// Parse a magnet link and print its tracker and info hash.
    MagnetParse { magnet: String },
    /// Handshake with a peer from a magnet link and print its metadata
    /// extension id.
    MagnetHandshake { magnet: String },
    /// Fetch metadata for a magnet link and print it.
    MagnetInfo { magnet: String },
    /// Download a single piece from a magnet link.
    MagnetDownloadPiece {
        #[arg(short)]
        output: PathBuf,
        magnet: String,
        piece: u32,
    },
    /// Download the whole file from a magnet link.
    MagnetDownload {
        #[arg(short)]
        output: PathBuf,
        magnet: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Decode { value } => {
            let decoded = skiff::bencode::decode(value.as_bytes())
                .context("decoding bencoded value")?;
            println!("{}", decoded.to_json());
        }
        Command::Info { torrent } => {
            let manifest = load_manifest(&torrent)?;
            print_manifest(&manifest);
        }
        Command::Peers { torrent } => {
            let manifest = load_manifest(&torrent)?;
            for peer in fetch_peers(&manifest.tracker_url, &manifest.info_hash, manifest.length)
                .await?
            {
                println!("{peer}");
            }
        }
        Command::Handshake { torrent, peer } => {
            let manifest = load_manifest(&torrent)?;
            let session = PeerSession::connect(peer, manifest.info_hash, false)
                .await
                .context("handshaking with peer")?;
            println!("Peer ID: {}", session.remote_peer_id().to_hex());
        }
        Command::DownloadPiece {
            output,
            torrent,
            piece,
        } => {
            let manifest = load_manifest(&torrent)?;
            let mut downloader = torrent_downloader(manifest).await?;
            let data = downloader.download_piece(piece).await?;
            tokio::fs::write(&output, data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::Download { output, torrent } => {
            let manifest = load_manifest(&torrent)?;
            let mut downloader = torrent_downloader(manifest).await?;
            let data = downloader.download().await?;
            tokio::fs::write(&output, data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::MagnetParse { magnet } => {
            let magnet = MagnetLink::parse(&magnet)?;
            println!("Tracker URL: {}", magnet.tracker_url);
            println!("Info Hash: {}", magnet.info_hash.to_hex());
        }
        Command::MagnetHandshake { magnet } => {
            let magnet = MagnetLink::parse(&magnet)?;
            let mut session = magnet_session(&magnet).await?;
            let metadata_id = session.extension_handshake().await?;
            println!("Peer ID: {}", session.remote_peer_id().to_hex());
            println!("Peer Metadata Extension ID: {metadata_id}");
        }
        Command::MagnetInfo { magnet } => {
            let magnet = MagnetLink::parse(&magnet)?;
            let mut session = magnet_session(&magnet).await?;
            session.extension_handshake().await?;
            let manifest = fetch_metadata(&mut session, &magnet).await?;
            print_manifest(&manifest);
        }
        Command::MagnetDownloadPiece {
            output,
            magnet,
            piece,
        } => {
            let magnet = MagnetLink::parse(&magnet)?;
            let mut downloader = magnet_downloader(&magnet).await?;
            let data = downloader.download_piece(piece).await?;
            tokio::fs::write(&output, data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::MagnetDownload { output, magnet } => {
            let magnet = MagnetLink::parse(&magnet)?;
            let mut downloader = magnet_downloader(&magnet).await?;
            let data = downloader.download().await?;
            tokio::fs::write(&output, data)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let data =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Manifest::from_bytes(&data).context("parsing torrent file")
}

fn print_manifest(manifest: &Manifest) {
    println!("Tracker URL: {}", manifest.tracker_url);
    println!("Length: {}", manifest.length);
    println!("Info Hash: {}", manifest.info_hash.to_hex());
    println!("Piece Length: {}", manifest.piece_length);
    println!("Piece Hashes:");
    for hash in &manifest.piece_hashes {
        println!("{}", InfoHash(*hash).to_hex());
    }
}

async fn fetch_peers(
    tracker_url: &str,
    info_hash: &InfoHash,
    left: u64,
) -> Result<Vec<SocketAddr>> {
    let tracker = HttpTracker::new(tracker_url)?;
    let response = tracker
        .announce(info_hash, &PeerId::local(), left)
        .await
        .context("announcing to tracker")?;
    Ok(response.peers)
}

/// Connects to every tracker-reported peer and brings each session past
/// unchoke, ready for requests.
async fn torrent_downloader(manifest: Manifest) -> Result<Downloader> {
    let peers = fetch_peers(&manifest.tracker_url, &manifest.info_hash, manifest.length).await?;

    let mut sessions = Vec::with_capacity(peers.len());
    for peer in peers {
        let mut session = PeerSession::connect(peer, manifest.info_hash, false)
            .await
            .with_context(|| format!("connecting to {peer}"))?;
        session.unchoke().await?;
        sessions.push(session);
    }

    Ok(Downloader::new(manifest, sessions))
}

/// Connects to the first tracker-reported peer with extensions required.
async fn magnet_session(magnet: &MagnetLink) -> Result<PeerSession> {
    let peers = fetch_peers(&magnet.tracker_url, &magnet.info_hash, MAGNET_LEFT).await?;
    let peer = *peers.first().context("tracker returned no peers")?;

    PeerSession::connect(peer, magnet.info_hash, true)
        .await
        .with_context(|| format!("connecting to {peer}"))
}

/// Fetches the `info` dictionary over ut_metadata and checks it against the
/// magnet's hash.
async fn fetch_metadata(session: &mut PeerSession, magnet: &MagnetLink) -> Result<Manifest> {
    let info_bytes = session.request_metadata().await?;
    let manifest = Manifest::from_info_bytes(&magnet.tracker_url, &info_bytes)?;
    ensure!(
        manifest.info_hash == magnet.info_hash,
        "metadata hash {} does not match magnet hash {}",
        manifest.info_hash,
        magnet.info_hash
    );
    Ok(manifest)
}

/// Full magnet pipeline: announce, connect every peer with extensions,
/// fetch metadata once, then bring every session past unchoke.
async fn magnet_downloader(magnet: &MagnetLink) -> Result<Downloader> {
    let peers = fetch_peers(&magnet.tracker_url, &magnet.info_hash, MAGNET_LEFT).await?;

    let mut sessions = Vec::with_capacity(peers.len());
    for peer in peers {
        let mut session = PeerSession::connect(peer, magnet.info_hash, true)
            .await
            .with_context(|| format!("connecting to {peer}"))?;
        session.extension_handshake().await?;
        sessions.push(session);
    }

    let first = sessions.first_mut().context("tracker returned no peers")?;
    let manifest = fetch_metadata(first, magnet).await?;

    for session in &mut sessions {
        session.unchoke().await?;
    }

    Ok(Downloader::new(manifest, sessions))
}
