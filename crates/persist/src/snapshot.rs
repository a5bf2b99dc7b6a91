use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

/// Errors from capturing or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
}

/// Serialized backend state: CBOR, zstd-compressed, with a SHA-256 digest of
/// the compressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBlob {
    bytes: Vec<u8>,
    sha256: String,
}

impl SnapshotBlob {
    /// Serialize `state` into a new blob.
    pub fn capture<T: Serialize + ?Sized>(state: &T) -> Result<Self, SnapshotError> {
        let cbor_bytes = cbor_serialize(state)?;
        let bytes = zstd_compress(&cbor_bytes)?;
        let sha256 = sha256_hex(&bytes);
        tracing::debug!(
            raw = cbor_bytes.len(),
            compressed = bytes.len(),
            "snapshot captured"
        );
        Ok(Self { bytes, sha256 })
    }

    /// Recompute the digest and compare it with the recorded one.
    pub fn verify(&self) -> bool {
        sha256_hex(&self.bytes) == self.sha256
    }

    /// Deserialize the captured state. Fails closed on a digest mismatch.
    pub fn restore<T: DeserializeOwned>(&self) -> Result<T, SnapshotError> {
        let actual = sha256_hex(&self.bytes);
        if actual != self.sha256 {
            return Err(SnapshotError::IntegrityMismatch {
                expected: self.sha256.clone(),
                actual,
            });
        }
        let cbor_bytes = zstd_decompress(&self.bytes)?;
        cbor_deserialize(&cbor_bytes)
    }

    /// Size of the compressed payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn digest(&self) -> &str {
        &self.sha256
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SnapshotError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| SnapshotError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T, SnapshotError> {
    ciborium::from_reader(data).map_err(|e| SnapshotError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
