//! HTTP tracker protocol (BEP-3)
//!
//! A tracker announce is a plain HTTP GET; the response is a bencoded
//! dictionary whose `peers` field packs one peer per six bytes.

mod error;
mod http;
mod response;

pub use error::TrackerError;
pub use http::HttpTracker;
pub use response::AnnounceResponse;

#[cfg(test)]
mod tests;
