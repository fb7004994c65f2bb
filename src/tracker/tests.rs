use super::response::parse_compact_peers;
use super::*;

#[test]
fn parse_compact_records() {
    let data = [
        0x7f, 0x00, 0x00, 0x01, 0x1a, 0xe1, // 127.0.0.1:6881
        0xc0, 0xa8, 0x00, 0x02, 0x1a, 0xe2, // 192.168.0.2:6882
    ];

    let peers = parse_compact_peers(&data);
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0].to_string(), "127.0.0.1:6881");
    assert_eq!(peers[1].to_string(), "192.168.0.2:6882");
}

#[test]
fn announce_response_from_bencode() {
    let mut body = b"d8:intervali1800e5:peers12:".to_vec();
    body.extend_from_slice(&[0x7f, 0, 0, 1, 0x1a, 0xe1, 0xc0, 0xa8, 0, 2, 0x1a, 0xe2]);
    body.push(b'e');

    let response = AnnounceResponse::from_bencode(&body).unwrap();
    assert_eq!(response.interval, Some(1800));
    assert_eq!(response.peers.len(), 2);
    assert_eq!(response.peers[0].to_string(), "127.0.0.1:6881");
    assert_eq!(response.peers[1].to_string(), "192.168.0.2:6882");
}

#[test]
fn announce_response_without_interval() {
    let mut body = b"d5:peers6:".to_vec();
    body.extend_from_slice(&[10, 0, 0, 1, 0x1a, 0xe1]);
    body.push(b'e');

    let response = AnnounceResponse::from_bencode(&body).unwrap();
    assert_eq!(response.interval, None);
    assert_eq!(response.peers[0].to_string(), "10.0.0.1:6881");
}

#[test]
fn announce_response_surfaces_failure() {
    let body = b"d14:failure reason11:not allowede";
    assert!(matches!(
        AnnounceResponse::from_bencode(body),
        Err(TrackerError::Failure(reason)) if reason == "not allowed"
    ));
}

#[test]
fn announce_response_rejects_ragged_peers() {
    let body = b"d5:peers5:aaaaae";
    assert!(matches!(
        AnnounceResponse::from_bencode(body),
        Err(TrackerError::InvalidResponse(_))
    ));
}

#[test]
fn rejects_non_http_url() {
    assert!(HttpTracker::new("udp://tracker.example:80").is_err());
}
