use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + flags (1) + length (4) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: "AR" (0x41 0x52).
pub const MAGIC: [u8; 2] = [0x41, 0x52];

/// Flag bit set on every frame of a message except the last one.
pub const FLAG_MORE: u8 = 0x01;

/// Default maximum size of a single frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum number of frames per multipart message.
pub const DEFAULT_MAX_PARTS: usize = 64;

/// One frame of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Whether more frames of the same message follow.
    pub more: bool,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(more: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            more,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a single frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────┬───────────┬─────────────────┐
/// │ Magic (2B)   │ Flags   │ Length    │ Payload         │
/// │ 0x41 0x52    │ (1B)    │ (4B LE)   │ (Length bytes)  │
/// │ "AR"         │ b0=MORE │           │                 │
/// └──────────────┴─────────┴───────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], more: bool, dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(if more { FLAG_MORE } else { 0 });
    dst.put_u32_le(len);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a single frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let flags = src[2];
    if flags & !FLAG_MORE != 0 {
        return Err(FrameError::UnknownFlags(flags));
    }

    let payload_len = u32::from_le_bytes([src[3], src[4], src[5], src[6]]) as usize;
    if payload_len > max_frame_size {
        return Err(FrameError::FrameTooLarge {
            size: payload_len,
            max: max_frame_size,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        more: flags & FLAG_MORE != 0,
        payload,
    }))
}

/// Limits applied by the multipart codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum size of one frame in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Maximum number of frames in one message. Default: 64.
    pub max_parts: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_parts: DEFAULT_MAX_PARTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_single_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello, actionrt!", true, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + 16);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert!(frame.more);
        assert_eq!(frame.payload.as_ref(), b"hello, actionrt!");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x41, 0x52, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3, "partial header must not be consumed");
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", false, &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE);
        assert!(matches!(result, Err(FrameError::InvalidMagic)));
    }

    #[test]
    fn test_decode_unknown_flags() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(0x80);
        buf.put_u32_le(0);

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE);
        assert!(matches!(result, Err(FrameError::UnknownFlags(0x80))));
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(0);
        buf.put_u32_le(1024 * 1024 * 32);

        let result = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE);
        assert!(matches!(result, Err(FrameError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_empty_payload_is_a_valid_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"", false, &mut buf).unwrap();

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert!(!frame.more);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(false, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
