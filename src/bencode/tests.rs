use std::collections::BTreeMap;

use bytes::Bytes;

use super::*;

#[test]
fn decode_integers() {
    assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
    assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
    assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
}

#[test]
fn decode_rejects_noncanonical_integers() {
    assert!(decode(b"i-0e").is_err());
    assert!(decode(b"i03e").is_err());
    assert!(decode(b"ie").is_err());
}

#[test]
fn decode_byte_strings() {
    assert_eq!(
        decode(b"4:spam").unwrap(),
        Value::Bytes(Bytes::from_static(b"spam"))
    );
    assert_eq!(decode(b"0:").unwrap(), Value::Bytes(Bytes::from_static(b"")));
}

#[test]
fn decode_binary_string_is_not_text() {
    let value = decode(b"3:\x00\xff\x01").unwrap();
    assert_eq!(value.as_bytes().unwrap().as_ref(), &[0x00, 0xff, 0x01]);
    assert_eq!(value.as_str(), None);
}

#[test]
fn decode_lists() {
    assert_eq!(decode(b"le").unwrap(), Value::List(vec![]));

    let value = decode(b"l4:spami42ee").unwrap();
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].as_str(), Some("spam"));
    assert_eq!(list[1].as_integer(), Some(42));
}

#[test]
fn decode_dicts() {
    assert_eq!(decode(b"de").unwrap(), Value::Dict(BTreeMap::new()));

    let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
    assert_eq!(value.get(b"cow").and_then(|v| v.as_str()), Some("moo"));
    assert_eq!(value.get(b"spam").and_then(|v| v.as_str()), Some("eggs"));
}

#[test]
fn decode_rejects_malformed_input() {
    assert!(matches!(decode(b""), Err(BencodeError::UnexpectedEof)));
    assert!(matches!(decode(b"l4:spam"), Err(BencodeError::UnexpectedEof)));
    assert!(matches!(decode(b"5:spam"), Err(BencodeError::UnexpectedEof)));
    assert!(matches!(decode(b"x"), Err(BencodeError::UnexpectedByte(b'x'))));
    assert!(matches!(
        decode(b"di1e3:cowe"),
        Err(BencodeError::InvalidDictKey)
    ));
    assert!(matches!(
        decode(b"i42eextra"),
        Err(BencodeError::TrailingData)
    ));
}

#[test]
fn decode_rejects_runaway_nesting() {
    let mut data = vec![b'l'; 100];
    data.extend(vec![b'e'; 100]);
    assert!(matches!(decode(&data), Err(BencodeError::NestingTooDeep)));
}

#[test]
fn decode_prefix_leaves_trailing_bytes() {
    let (value, consumed) = decode_prefix(b"d8:msg_typei1ee\x01\x02\x03").unwrap();
    assert_eq!(value.get(b"msg_type").and_then(|v| v.as_integer()), Some(1));
    assert_eq!(consumed, 15);
}

#[test]
fn encode_values() {
    assert_eq!(encode(&Value::Integer(-42)).unwrap(), b"i-42e");
    assert_eq!(encode(&Value::string("spam")).unwrap(), b"4:spam");
    assert_eq!(
        encode(&Value::List(vec![Value::string("spam"), Value::Integer(42)])).unwrap(),
        b"l4:spami42ee"
    );
}

#[test]
fn encode_sorts_dict_keys() {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"zebra"), Value::Integer(1));
    dict.insert(Bytes::from_static(b"apple"), Value::Integer(2));
    assert_eq!(
        encode(&Value::Dict(dict)).unwrap(),
        b"d5:applei2e5:zebrai1ee"
    );
}

#[test]
fn roundtrip_decode_encode() {
    // Keys are already sorted, so re-encoding must reproduce the input.
    let original: &[u8] =
        b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee";
    let decoded = decode(original).unwrap();
    assert_eq!(encode(&decoded).unwrap(), original);
}

#[test]
fn roundtrip_encode_decode() {
    let mut info = BTreeMap::new();
    info.insert(Bytes::from_static(b"length"), Value::Integer(92063));
    info.insert(
        Bytes::from_static(b"pieces"),
        Value::Bytes(Bytes::from(vec![0xabu8; 40])),
    );
    let value = Value::Dict(info);

    assert_eq!(decode(&encode(&value).unwrap()).unwrap(), value);
}

#[test]
fn json_rendering() {
    let value = decode(b"d3:foo3:bar5:helloi52ee").unwrap();
    assert_eq!(value.to_json().to_string(), r#"{"foo":"bar","hello":52}"#);

    let value = decode(b"l5:helloi-3ee").unwrap();
    assert_eq!(value.to_json().to_string(), r#"["hello",-3]"#);
}
