/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4152 \"AR\")")]
    InvalidMagic,

    /// The frame header carries flag bits this codec does not understand.
    #[error("unknown frame flags: {0:#04x}")]
    UnknownFlags(u8),

    /// A single frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A multipart message has more frames than allowed.
    #[error("too many frames in message ({count}, max {max})")]
    TooManyParts { count: usize, max: usize },

    /// Attempted to send a message with no frames.
    #[error("cannot encode an empty multipart message")]
    EmptyMessage,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
