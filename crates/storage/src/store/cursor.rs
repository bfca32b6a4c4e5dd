//! Opaque pagination cursors.
//!
//! A cursor is the engine's last-evaluated key (all string attributes in this
//! schema) serialized as JSON and base64-encoded. Callers thread it through
//! unchanged; nothing outside this module inspects its contents.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::StoreError;

/// Encode a key map into an opaque cursor string.
pub fn encode(key: &HashMap<String, String>) -> String {
    // Serializing a map of strings cannot fail.
    let json = serde_json::to_vec(key).expect("cursor key serialization");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor back into the key map.
pub fn decode(cursor: &str) -> Result<HashMap<String, String>, StoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut key = HashMap::new();
        key.insert("PK".to_string(), "USER#abc".to_string());
        key.insert("SK".to_string(), "META".to_string());

        let cursor = encode(&key);
        assert_eq!(decode(&cursor).unwrap(), key);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64 at all!!!").is_err());
        // Valid base64, invalid JSON.
        let cursor = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(decode(&cursor).is_err());
    }

    #[test]
    fn test_cursor_is_opaque_ascii() {
        let mut key = HashMap::new();
        key.insert("PK".to_string(), "HIST#x".to_string());
        let cursor = encode(&key);
        assert!(cursor.chars().all(|c| c.is_ascii_alphanumeric()
            || c == '-'
            || c == '_'));
    }
}
