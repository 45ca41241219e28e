use tokio_util::sync::CancellationToken;

/// Shared lifetime scope for every socket bound under it.
///
/// Terminating the context is the transport-level shutdown signal: pending
/// and future `recv`/`send` calls on its sockets fail with
/// [`TransportError::Terminated`](crate::TransportError::Terminated), and
/// open connections are closed without lingering.
#[derive(Debug, Clone, Default)]
pub struct TransportContext {
    token: CancellationToken,
}

impl TransportContext {
    /// Create a live context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate the context and every socket bound under it.
    pub fn terminate(&self) {
        self.token.cancel();
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is terminated.
    pub async fn terminated(&self) {
        self.token.cancelled().await;
    }

    /// A token cancelled when this context terminates (or cancelled on its own).
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
