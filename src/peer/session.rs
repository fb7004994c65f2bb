use super::error::PeerError;
use super::extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID};
use super::message::{Handshake, Message, MessageId};
use super::metadata::{MetadataMessage, MetadataMessageType};
use super::peer_id::PeerId;
use super::piece::Block;
use super::transport::PeerTransport;
use crate::metainfo::InfoHash;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::debug;

/// A per-connection peer session.
///
/// The session owns its TCP connection exclusively and advances through the
/// protocol in a fixed order: handshake on connect, then one bitfield, then
/// either interested/unchoke (torrent path) or the extension handshake and
/// metadata fetch (magnet path). Requests are only legal once the peer has
/// unchoked us. Dropping the session closes the connection.
pub struct PeerSession {
    addr: SocketAddr,
    transport: PeerTransport,
    remote_peer_id: PeerId,
    extension_supported: bool,
    metadata_extension_id: u8,
    bitfield_consumed: bool,
    unchoked: bool,
}

impl PeerSession {
    /// Connects to a peer and exchanges handshakes.
    ///
    /// The extension-protocol bit is advertised iff `with_extensions` is
    /// set, and in that case the remote must advertise it back or the
    /// session fails with [`PeerError::ExtensionsUnsupported`].
    pub async fn connect(
        addr: SocketAddr,
        info_hash: InfoHash,
        with_extensions: bool,
    ) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(addr).await?;
        let mut transport = PeerTransport::new(stream);

        let handshake = Handshake::new(
            *info_hash.as_bytes(),
            *PeerId::local().as_bytes(),
            with_extensions,
        );
        transport.send_handshake(&handshake).await?;

        let theirs = transport.receive_handshake().await?;

        if &theirs.info_hash != info_hash.as_bytes() {
            return Err(PeerError::InfoHashMismatch);
        }

        let extension_supported = theirs.supports_extensions();
        if with_extensions && !extension_supported {
            return Err(PeerError::ExtensionsUnsupported);
        }

        debug!(%addr, extensions = extension_supported, "peer handshake complete");

        Ok(Self {
            addr,
            transport,
            remote_peer_id: PeerId::from_bytes(theirs.peer_id),
            extension_supported,
            metadata_extension_id: 0,
            bitfield_consumed: false,
            unchoked: false,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn remote_peer_id(&self) -> PeerId {
        self.remote_peer_id
    }

    pub fn extension_supported(&self) -> bool {
        self.extension_supported
    }

    /// The message id the peer assigned to ut_metadata, or 0 before the
    /// extension handshake.
    pub fn metadata_extension_id(&self) -> u8 {
        self.metadata_extension_id
    }

    /// Consumes the peer's bitfield message, discarding its payload.
    ///
    /// Idempotent: the bitfield arrives once per connection, and both the
    /// unchoke and extension-handshake paths funnel through here.
    pub async fn consume_bitfield(&mut self) -> Result<(), PeerError> {
        if self.bitfield_consumed {
            return Ok(());
        }

        self.expect_message(MessageId::Bitfield).await?;
        self.bitfield_consumed = true;
        Ok(())
    }

    /// Declares interest and waits for the peer to unchoke us.
    pub async fn unchoke(&mut self) -> Result<(), PeerError> {
        self.consume_bitfield().await?;

        self.transport.send_message(&Message::Interested).await?;
        self.expect_message(MessageId::Unchoke).await?;
        self.unchoked = true;
        Ok(())
    }

    /// Performs the BEP-10 extension handshake and records the peer's
    /// ut_metadata message id.
    pub async fn extension_handshake(&mut self) -> Result<u8, PeerError> {
        self.consume_bitfield().await?;

        let body = ExtensionHandshake::local().encode()?;
        self.send_extended(EXTENSION_HANDSHAKE_ID, body).await?;

        let (id, payload) = self.receive_extended().await?;
        if id != EXTENSION_HANDSHAKE_ID {
            return Err(PeerError::Extension(format!(
                "expected extension handshake, got id {id}"
            )));
        }

        let theirs = ExtensionHandshake::decode(&payload)?;
        let metadata_id = theirs
            .extension_id("ut_metadata")
            .ok_or_else(|| PeerError::Extension("peer offers no ut_metadata".into()))?;

        self.metadata_extension_id = metadata_id;
        Ok(metadata_id)
    }

    /// Requests metadata piece 0 and returns the raw `info` dictionary
    /// bytes.
    ///
    /// Requires a prior [`extension_handshake`](Self::extension_handshake).
    pub async fn request_metadata(&mut self) -> Result<Bytes, PeerError> {
        if self.metadata_extension_id == 0 {
            return Err(PeerError::Protocol(
                "metadata requested before extension handshake".into(),
            ));
        }

        let body = MetadataMessage::request(0).encode()?;
        self.send_extended(self.metadata_extension_id, body).await?;

        let (_, payload) = self.receive_extended().await?;
        let message = MetadataMessage::decode(&payload)?;

        match (message.msg_type, message.data) {
            (MetadataMessageType::Data, Some(data)) => Ok(data),
            (MetadataMessageType::Reject, _) => {
                Err(PeerError::Extension("metadata request rejected".into()))
            }
            _ => Err(PeerError::Extension("metadata message carries no data".into())),
        }
    }

    /// Requests a block. Legal only after [`unchoke`](Self::unchoke).
    pub async fn request(&mut self, index: u32, begin: u32, length: u32) -> Result<(), PeerError> {
        if !self.unchoked {
            return Err(PeerError::Protocol("request before unchoke".into()));
        }

        self.transport
            .send_message(&Message::Request {
                index,
                begin,
                length,
            })
            .await
    }

    /// Reads the next piece message and returns its block.
    pub async fn read_piece(&mut self) -> Result<Block, PeerError> {
        match self.receive_skipping_keepalive().await? {
            Message::Piece { index, begin, data } => Ok(Block {
                piece_index: index,
                begin,
                data,
            }),
            other => Err(unexpected(MessageId::Piece, &other)),
        }
    }

    async fn send_extended(&mut self, id: u8, payload: Bytes) -> Result<(), PeerError> {
        self.transport
            .send_message(&Message::Extended { id, payload })
            .await
    }

    async fn receive_extended(&mut self) -> Result<(u8, Bytes), PeerError> {
        match self.receive_skipping_keepalive().await? {
            Message::Extended { id, payload } => Ok((id, payload)),
            other => Err(unexpected(MessageId::Extended, &other)),
        }
    }

    async fn expect_message(&mut self, expected: MessageId) -> Result<(), PeerError> {
        let message = self.receive_skipping_keepalive().await?;
        if message.id() == Some(expected) {
            Ok(())
        } else {
            Err(unexpected(expected, &message))
        }
    }

    async fn receive_skipping_keepalive(&mut self) -> Result<Message, PeerError> {
        loop {
            match self.transport.receive_message().await? {
                Message::KeepAlive => continue,
                message => return Ok(message),
            }
        }
    }
}

fn unexpected(expected: MessageId, actual: &Message) -> PeerError {
    PeerError::UnexpectedMessage {
        expected,
        actual: actual.id().map(|id| id as u8).unwrap_or(0),
    }
}
