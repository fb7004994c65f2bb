use super::error::MetainfoError;
use super::info_hash::InfoHash;
use std::collections::HashMap;

/// A parsed magnet link (BEP-9).
///
/// Magnet links identify a torrent by info hash alone; the `info`
/// dictionary is later fetched from a peer over the metadata extension.
///
/// # Examples
///
/// ```
/// use skiff::metainfo::MagnetLink;
///
/// let magnet = MagnetLink::parse(
///     "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a\
///      &dn=example&tr=http%3A%2F%2Ftracker.example.com%2Fannounce",
/// )
/// .unwrap();
///
/// assert_eq!(magnet.tracker_url, "http://tracker.example.com/announce");
/// assert_eq!(magnet.display_name.as_deref(), Some("example"));
/// ```
#[derive(Debug, Clone)]
pub struct MagnetLink {
    /// The torrent's info hash, from the `xt` parameter.
    pub info_hash: InfoHash,
    /// Tracker URL from the `tr` parameter.
    pub tracker_url: String,
    /// Suggested display name from the `dn` parameter.
    pub display_name: Option<String>,
}

impl MagnetLink {
    /// Parses a magnet URI of the form
    /// `magnet:?xt=urn:btih:<40-hex>&tr=<url>[&dn=<name>]`.
    ///
    /// # Errors
    ///
    /// Returns [`MetainfoError::InvalidMagnetLink`] if the prefix is wrong,
    /// `xt` is missing or not a 40-hex `urn:btih`, or `tr` is missing.
    pub fn parse(uri: &str) -> Result<Self, MetainfoError> {
        let query = uri
            .strip_prefix("magnet:?")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing magnet:? prefix".into()))?;

        let params = parse_query_string(query);

        let xt = params
            .get("xt")
            .and_then(|v| v.first())
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing xt parameter".into()))?;

        let hex = xt
            .strip_prefix("urn:btih:")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink(format!("unsupported xt: {xt}")))?;

        let info_hash = InfoHash::from_hex(hex)
            .map_err(|_| MetainfoError::InvalidMagnetLink(format!("invalid info hash: {hex}")))?;

        let tracker_url = params
            .get("tr")
            .and_then(|v| v.first())
            .map(|s| url_decode(s))
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing tr parameter".into()))?;

        let display_name = params
            .get("dn")
            .and_then(|v| v.first())
            .map(|s| url_decode(s));

        Ok(Self {
            info_hash,
            tracker_url,
            display_name,
        })
    }
}

fn parse_query_string(query: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();

    for part in query.split('&') {
        if let Some((key, value)) = part.split_once('=') {
            params
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
    }

    params
}

fn url_decode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else if c == '+' {
            result.push(' ');
        } else {
            result.push(c);
        }
    }

    result
}
