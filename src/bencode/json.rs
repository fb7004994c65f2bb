//! JSON rendering for decoded bencode values.
//!
//! Display-only: byte strings are converted lossily to text, which is fine
//! for the `decode` command but must never feed back into hashing.

use super::value::Value;

impl Value {
    /// Renders the value as JSON.
    ///
    /// Integers map to numbers, byte strings to (lossy UTF-8) strings,
    /// lists to arrays, and dictionaries to objects in key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiff::bencode::decode;
    ///
    /// let value = decode(b"d3:foo3:bar5:helloi52ee").unwrap();
    /// assert_eq!(value.to_json().to_string(), r#"{"foo":"bar","hello":52}"#);
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Bytes(b) => serde_json::Value::from(String::from_utf8_lossy(b).into_owned()),
            Value::List(items) => serde_json::Value::from_iter(items.iter().map(Value::to_json)),
            Value::Dict(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v.to_json()))
                    .collect(),
            ),
        }
    }
}
