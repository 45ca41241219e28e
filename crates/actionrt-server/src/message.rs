//! Structural validation of inbound multipart requests.
//!
//! Expected frames, identity first as added by the router:
//!
//! ```text
//! [peer-identity, <empty>, request-id, action, schema-blob?, payload-blob?]
//! ```

use bytes::Bytes;

use actionrt_frame::Multipart;

const IDENTITY: usize = 0;
const DELIMITER: usize = 1;
const REQUEST_ID: usize = 2;
const ACTION: usize = 3;
const SCHEMA: usize = 4;
const PAYLOAD: usize = 5;
const MAX_FRAMES: usize = 6;

/// A structurally valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    identity: Bytes,
    request_id: String,
    action: String,
    schema: Option<Bytes>,
    payload: Option<Bytes>,
}

impl InboundMessage {
    /// Transport identity of the requesting peer.
    pub fn identity(&self) -> &Bytes {
        &self.identity
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Schema update blob, if the request carries one.
    pub fn schema(&self) -> Option<&Bytes> {
        self.schema.as_ref()
    }

    /// Encoded command, if the request carries one.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }
}

/// Why a message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No reply can be addressed: the message is dropped.
    #[error("unaddressable message: {0}")]
    Unaddressable(&'static str),

    /// The peer and request id are known, so the caller gets an error reply.
    #[error("malformed request {request_id}: {reason}")]
    Malformed {
        identity: Bytes,
        request_id: String,
        reason: &'static str,
    },
}

/// Split a raw router message into its request fields.
pub fn validate(message: Multipart) -> Result<InboundMessage, ValidationError> {
    if message.len() <= REQUEST_ID {
        return Err(ValidationError::Unaddressable("missing request frames"));
    }

    let mut parts = message.into_parts();
    let frame_count = parts.len();

    let identity = std::mem::take(&mut parts[IDENTITY]);
    if identity.is_empty() {
        return Err(ValidationError::Unaddressable("empty peer identity"));
    }
    if !parts[DELIMITER].is_empty() {
        return Err(ValidationError::Unaddressable("missing empty delimiter frame"));
    }
    let request_id = match std::str::from_utf8(&parts[REQUEST_ID]) {
        Ok("") => return Err(ValidationError::Unaddressable("empty request id")),
        Ok(rid) => rid.to_string(),
        Err(_) => return Err(ValidationError::Unaddressable("request id is not valid UTF-8")),
    };

    let malformed = |reason| ValidationError::Malformed {
        identity: identity.clone(),
        request_id: request_id.clone(),
        reason,
    };

    if frame_count > MAX_FRAMES {
        return Err(malformed("too many frames"));
    }
    let action = match parts.get(ACTION).map(|frame| std::str::from_utf8(frame)) {
        None | Some(Ok("")) => return Err(malformed("missing action name")),
        Some(Ok(action)) => action.to_string(),
        Some(Err(_)) => return Err(malformed("action name is not valid UTF-8")),
    };

    let optional = |index: usize| parts.get(index).filter(|frame| !frame.is_empty()).cloned();

    Ok(InboundMessage {
        schema: optional(SCHEMA),
        payload: optional(PAYLOAD),
        identity,
        request_id,
        action,
    })
}
