//! Canonical CBOR encoding for journal entries.
//!
//! RFC 8949 Core Deterministic Encoding, restricted to what the journal
//! needs:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags
//!
//! The same entry must produce the same bytes everywhere, since entry ids
//! are hashes of these bytes.

use ciborium::value::{Integer, Value};

use crate::error::CoreError;

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Decode bytes into a CBOR value.
///
/// Rejects trailing bytes and anything that does not re-encode to the
/// exact input, so non-canonical encodings never verify.
pub fn decode_canonical(bytes: &[u8]) -> Result<Value, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let reencoded = encode_canonical(&value)?;
    if reencoded != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }
    Ok(value)
}

/// Build a map value with integer keys.
pub fn int_map(entries: Vec<(u64, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Integer(k.into()), v))
            .collect(),
    )
}

/// Look up an integer key in a decoded map.
pub fn map_get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
        .map(|(_, v)| v)
}

/// Read an unsigned integer.
pub fn as_u64(value: Option<&Value>, field: &str) -> Result<u64, CoreError> {
    match value {
        Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
            .map_err(|_| CoreError::DecodingError(format!("{} out of range", field))),
        _ => Err(CoreError::DecodingError(format!("missing {}", field))),
    }
}

/// Read a byte string of exactly `N` bytes.
pub fn as_array<const N: usize>(value: Option<&Value>, field: &str) -> Result<[u8; N], CoreError> {
    match value {
        Some(Value::Bytes(b)) if b.len() == N => {
            let mut arr = [0u8; N];
            arr.copy_from_slice(b);
            Ok(arr)
        }
        _ => Err(CoreError::DecodingError(format!("invalid {}", field))),
    }
}

/// Read a byte string of any length.
pub fn as_bytes<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a [u8], CoreError> {
    match value {
        Some(Value::Bytes(b)) => Ok(b),
        _ => Err(CoreError::DecodingError(format!("invalid {}", field))),
    }
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        other => {
            return Err(CoreError::EncodingError(format!(
                "unsupported CBOR value: {:?}",
                other
            )))
        }
    }
    Ok(())
}

/// Major types 0 and 1.
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let cases: [(u64, &[u8]); 5] = [
            (0, &[0x00]),
            (23, &[0x17]),
            (24, &[0x18, 0x18]),
            (256, &[0x19, 0x01, 0x00]),
            (65536, &[0x1a, 0x00, 0x01, 0x00, 0x00]),
        ];
        for (n, expected) in cases {
            let bytes = encode_canonical(&Value::Integer(n.into())).unwrap();
            assert_eq!(bytes, expected, "encoding of {}", n);
        }
    }

    #[test]
    fn test_map_keys_sorted() {
        let unsorted = Value::Map(vec![
            (Value::Integer(2.into()), Value::Null),
            (Value::Integer(0.into()), Value::Null),
            (Value::Integer(1.into()), Value::Null),
        ]);
        let bytes = encode_canonical(&unsorted).unwrap();
        assert_eq!(bytes, vec![0xa3, 0x00, 0xf6, 0x01, 0xf6, 0x02, 0xf6]);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // 1 encoded with a one-byte length prefix instead of inline
        let padded = [0x18, 0x01];
        assert!(decode_canonical(&padded).is_err());

        let canonical = [0x01];
        assert!(decode_canonical(&canonical).is_ok());
    }

    #[test]
    fn test_floats_rejected() {
        assert!(encode_canonical(&Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_map_helpers() {
        let value = int_map(vec![
            (0, Value::Integer(7.into())),
            (1, Value::Bytes(vec![0xaa; 4])),
        ]);
        let bytes = encode_canonical(&value).unwrap();
        let decoded = decode_canonical(&bytes).unwrap();
        let Value::Map(map) = decoded else {
            panic!("expected map");
        };
        assert_eq!(as_u64(map_get(&map, 0), "n").unwrap(), 7);
        assert_eq!(as_array::<4>(map_get(&map, 1), "b").unwrap(), [0xaa; 4]);
        assert!(as_array::<5>(map_get(&map, 1), "b").is_err());
    }
}
