// crates/keel-core/src/hex.rs
//
// Hex (de)serialization for 32-byte identities.
//
// Identities serialize as "0x"-prefixed lowercase hex strings so they are
// valid JSON object keys when used in maps.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Encode 32 bytes as a "0x"-prefixed lowercase hex string.
pub(crate) fn encode(bytes: &[u8; 32]) -> String {
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Decode a "0x"-prefixed 64-digit hex string into 32 bytes.
pub(crate) fn decode(s: &str) -> Result<[u8; 32], String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 64 {
        return Err(format!("expected 64 hex digits, got {}", digits.len()));
    }
    let mut bytes = [0u8; 32];
    for (i, chunk) in digits.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
        bytes[i] = u8::from_str_radix(pair, 16).map_err(|e| e.to_string())?;
    }
    Ok(bytes)
}

pub(crate) fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode(bytes))
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
    struct HexVisitor;

    impl Visitor<'_> for HexVisitor {
        type Value = [u8; 32];

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a 0x-prefixed 64-digit hex string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            decode(v).map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_str(HexVisitor)
}
