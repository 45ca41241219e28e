use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in socket transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint string could not be parsed.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// Failed to bind to the specified endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be framed or unframed.
    #[error("frame error: {0}")]
    Frame(#[from] actionrt_frame::FrameError),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// No connected peer has the given identity.
    #[error("no connected peer with identity '{0}'")]
    UnknownPeer(String),

    /// The peer's outbound queue is full; the message was dropped.
    #[error("outbound queue full for peer '{0}'")]
    PeerBackpressure(String),

    /// The remote side closed the connection.
    #[error("peer disconnected")]
    Disconnected,

    /// No message arrived within the allowed time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The transport context has been terminated.
    #[error("transport context terminated")]
    Terminated,
}

impl TransportError {
    /// Whether the error means the socket can no longer be used.
    ///
    /// Everything else is scoped to a single message or peer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Terminated)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
