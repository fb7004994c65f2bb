use rand::Rng as _;
use std::fmt;
use std::sync::OnceLock;

const PEER_ID_PREFIX: &[u8] = b"-SK0001-";

/// A 20-byte peer identifier.
///
/// The local peer id is Azureus-style: a client prefix followed by random
/// bytes, generated once per process from the OS-seeded RNG.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    /// Returns this process's peer id, generating it on first use.
    pub fn local() -> Self {
        static LOCAL: OnceLock<PeerId> = OnceLock::new();
        *LOCAL.get_or_init(Self::generate)
    }

    fn generate() -> Self {
        let mut id = [0u8; 20];
        id[..PEER_ID_PREFIX.len()].copy_from_slice(PEER_ID_PREFIX);
        rand::rng().fill(&mut id[PEER_ID_PREFIX.len()..]);
        Self(id)
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Converts to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        crate::metainfo::hex_encode(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
