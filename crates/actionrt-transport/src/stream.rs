use tokio::io::{AsyncRead, AsyncWrite};

/// A connected byte stream of any supported transport.
pub trait IoStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> IoStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased connected stream, so TCP and Unix connections share one code path.
pub type BoxedStream = Box<dyn IoStream>;
