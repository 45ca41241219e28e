//! Reply assembly.

use bytes::Bytes;
use serde_json::Value;

use actionrt_frame::Multipart;

use crate::codec::{pack, CodecError};
use crate::payload::ReplyEnvelope;

/// Serialize an error reply for `request_id`.
pub fn build_error(request_id: &str, message: &str) -> Result<Bytes, CodecError> {
    pack(&ReplyEnvelope::failure(request_id, message))
}

/// Serialize a successful reply for `request_id`.
pub fn build_reply(request_id: &str, result: Value) -> Result<Bytes, CodecError> {
    pack(&ReplyEnvelope::success(request_id, result))
}

/// Outbound frames addressed to `identity`.
pub fn frames(identity: Bytes, reply: Bytes) -> Multipart {
    Multipart::from_parts([identity, Bytes::new(), reply])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::unpack;
    use crate::payload::ERROR_STATUS;

    #[test]
    fn error_reply_carries_message_and_no_result() {
        let data = build_error("r1", "Invalid action").unwrap();
        let envelope: ReplyEnvelope = unpack(&data).unwrap();
        assert_eq!(envelope.request_id, "r1");
        assert!(envelope.result.is_none());
        let error = envelope.error.unwrap();
        assert_eq!(error.message, "Invalid action");
        assert_eq!(error.code, 0);
        assert_eq!(error.status, ERROR_STATUS);
    }

    #[test]
    fn reply_frames_are_identity_delimiter_body() {
        let multipart = frames(Bytes::from_static(b"peer-3"), Bytes::from_static(b"{}"));
        let parts = multipart.into_parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].as_ref(), b"peer-3");
        assert!(parts[1].is_empty());
    }
}
