use actionrt_transport::TransportError;

/// Errors that stop a server from running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be opened.
    #[error("failed to open socket at address \"{endpoint}\": {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The transport context was terminated before the server started.
    #[error("transport context terminated before the server started")]
    Terminated,
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Why a request was answered with an error reply.
///
/// The `Display` text is what the caller sees in `error.message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid action for component {title}: \"{action}\"")]
    UnknownAction { title: String, action: String },

    #[error("Invalid payload for component {title}: \"{action}\"")]
    InvalidPayload { title: String, action: String },

    #[error("Malformed request for component {title}: {reason}")]
    Malformed { title: String, reason: String },

    /// Failure reported by the action handler itself.
    #[error("{0}")]
    Handler(String),

    /// The handler's result could not be serialized. Never sent to the caller.
    #[error("Failed to serialize reply: {0}")]
    Serialization(String),
}

impl RequestError {
    /// Whether the caller gets an error reply for this failure.
    pub fn is_replied(&self) -> bool {
        !matches!(self, RequestError::Serialization(_))
    }
}
