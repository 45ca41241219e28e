//! Length-prefixed multipart message framing for actionrt sockets.
//!
//! Every frame on the wire carries:
//! - A 2-byte magic number ("AR") for stream synchronization
//! - A 1-byte flag set (bit 0: more frames follow in this message)
//! - A 4-byte little-endian payload length
//!
//! Frames are grouped into [`Multipart`] messages, which are delivered
//! atomically: a reader never observes half of a message.

pub mod codec;
pub mod error;
pub mod message;
pub mod multipart;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_PARTS,
    FLAG_MORE, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Result};
pub use message::Multipart;
pub use multipart::MultipartCodec;
