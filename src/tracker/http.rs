use super::error::TrackerError;
use super::response::AnnounceResponse;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The port we report to trackers. Nothing listens on it; this client only
/// downloads.
pub const LISTEN_PORT: u16 = 6881;

/// An HTTP tracker client.
///
/// # Examples
///
/// ```no_run
/// use skiff::metainfo::InfoHash;
/// use skiff::peer::PeerId;
/// use skiff::tracker::HttpTracker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = HttpTracker::new("http://tracker.example.com/announce")?;
/// let hash = InfoHash::from_hex("c12fe1c06bba254a9dc9f519b335aa7c1367a88a")?;
///
/// let response = tracker.announce(&hash, &PeerId::local(), 92063).await?;
/// println!("{} peers", response.peers.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Announces to the tracker and returns the peer list.
    ///
    /// `left` is the number of bytes still wanted; magnet flows pass 1
    /// because the real length is unknown before the metadata fetch.
    pub async fn announce(
        &self,
        info_hash: &InfoHash,
        peer_id: &PeerId,
        left: u64,
    ) -> Result<AnnounceResponse, TrackerError> {
        let url = format!(
            "{}?info_hash={}&peer_id={}&port={}&uploaded=0&downloaded=0&left={}&compact=1",
            self.url,
            url_encode(info_hash.as_bytes()),
            url_encode(peer_id.as_bytes()),
            LISTEN_PORT,
            left,
        );

        let body = self.client.get(&url).send().await?.bytes().await?;
        let response = AnnounceResponse::from_bencode(&body)?;

        debug!(url = %self.url, peers = response.peers.len(), "tracker announce");

        Ok(response)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

// Percent-encodes raw bytes for a query value; unreserved bytes pass through.
fn url_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.' || b == b'~' {
                format!("{}", b as char)
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}
