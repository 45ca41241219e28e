//! Payload codec shared by requests, replies and schema updates.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors from packing or unpacking a payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to pack payload: {0}")]
    Pack(#[source] serde_json::Error),

    #[error("failed to unpack payload: {0}")]
    Unpack(#[source] serde_json::Error),
}

/// Serialize a value into a wire payload.
pub fn pack<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, CodecError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(CodecError::Pack)
}

/// Deserialize a wire payload.
pub fn unpack<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(data).map_err(CodecError::Unpack)
}
