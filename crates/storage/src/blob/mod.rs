//! Blob offload for oversized test-case payloads.
//!
//! Items above the configured inline threshold keep only a pointer in the
//! table; the payload itself is zstd-compressed JSON in object storage under a
//! deterministic key, so re-extracting a problem overwrites rather than leaks
//! objects. A missing or truncated blob is a loud failure, never a silent
//! empty test case.

mod memory;
mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// zstd level used for offloaded payloads. Test-case text compresses well at
/// low levels; higher levels cost write latency for little gain.
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
    #[error("blob corrupt: {0}")]
    Corrupt(String),
}

pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// Object storage operations needed by the offload path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> BlobResult<()>;

    /// Fetch a blob; [`BlobError::NotFound`] when the key does not exist.
    async fn get(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Delete is idempotent; an absent key is a no-op.
    async fn delete(&self, key: &str) -> BlobResult<()>;
}

/// Wire form of an offloaded test-case payload, before compression.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct TestCasePayload {
    #[serde(rename = "i")]
    input: String,
    #[serde(rename = "o")]
    output: String,
}

/// Deterministic object key for a test case.
pub fn test_case_object_key(platform: &str, problem_id: &str, index: u32) -> String {
    format!("testcases/{platform}/{problem_id}/{index}.zst")
}

/// Combined input+output size in bytes; the value compared against the
/// inline threshold and persisted for verification on read.
pub fn payload_size(input: &str, output: &str) -> u64 {
    input.len() as u64 + output.len() as u64
}

/// Serialize and compress a payload for offload. Returns the compressed
/// bytes.
pub fn encode_payload(input: &str, output: &str) -> BlobResult<Vec<u8>> {
    let payload = TestCasePayload {
        input: input.to_string(),
        output: output.to_string(),
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|e| BlobError::Corrupt(format!("payload serialization: {e}")))?;
    zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| BlobError::Corrupt(format!("payload compression: {e}")))
}

/// Decompress and deserialize an offloaded payload, verifying the recovered
/// size against the one recorded at write time.
pub fn decode_payload(bytes: &[u8], expected_size: u64) -> BlobResult<(String, String)> {
    let json = zstd::decode_all(bytes)
        .map_err(|e| BlobError::Corrupt(format!("payload decompression: {e}")))?;
    let payload: TestCasePayload = serde_json::from_slice(&json)
        .map_err(|e| BlobError::Corrupt(format!("payload deserialization: {e}")))?;
    let actual = payload_size(&payload.input, &payload.output);
    if actual != expected_size {
        return Err(BlobError::Corrupt(format!(
            "payload size mismatch: expected {expected_size} bytes, recovered {actual}"
        )));
    }
    Ok((payload.input, payload.output))
}
