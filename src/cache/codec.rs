//! Pluggable value codecs for the remote facade.
//!
//! Values cross the wire as opaque bytes. A [`ValueCodec`] is chosen once
//! when a [`RemoteOrderedCache`](crate::RemoteOrderedCache) is built:
//!
//! - [`JsonCodec`]: human-readable JSON via `serde_json`.
//! - [`BincodeCodec`]: compact binary via `bincode`.
//! - [`RawBytesCodec`]: passes `Vec<u8>` through untouched.

use crate::cache::error::CacheError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// A value could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value codec error: {}", self.message)
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for CacheError {
    fn from(err: CodecError) -> Self {
        CacheError::Serialization {
            message: err.message,
        }
    }
}

/// Converts values of type `V` to and from bytes.
///
/// Implementations must be `Send + Sync` so one codec can be shared by every
/// request a client issues.
pub trait ValueCodec<V>: Send + Sync + std::fmt::Debug + 'static {
    /// Encodes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the value cannot be represented.
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError>;

    /// Decodes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the bytes are malformed or do not describe
    /// a `V`.
    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError>;

    /// MIME-like identifier of the format, e.g. `"application/json"`.
    #[must_use]
    fn content_type(&self) -> &'static str;
}

// ─── JSON ───────────────────────────────────────────────────────────────────

/// JSON codec using `serde_json`.
pub struct JsonCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonCodec<V> {
    /// Create a new JSON codec.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<V> ValueCodec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

// ─── Bincode ────────────────────────────────────────────────────────────────

/// Bincode codec for compact binary payloads.
pub struct BincodeCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> BincodeCodec<V> {
    /// Create a new Bincode codec.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for BincodeCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for BincodeCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for BincodeCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<V> ValueCodec<V> for BincodeCodec<V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| CodecError {
            message: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError> {
        let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CodecError {
                message: e.to_string(),
            })?;
        if read != bytes.len() {
            return Err(CodecError {
                message: format!("{} trailing bytes", bytes.len() - read),
            });
        }
        Ok(value)
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/x-bincode"
    }
}

// ─── Raw bytes ──────────────────────────────────────────────────────────────

/// Identity codec for caches that already store bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesCodec;

impl RawBytesCodec {
    /// Create a new raw bytes codec.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec<Vec<u8>> for RawBytesCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/octet-stream"
    }
}
