use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use actionrt_frame::{FrameConfig, Multipart, MultipartCodec};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::BoxedStream;

/// Client socket for talking to a [`RouterSocket`](crate::RouterSocket).
///
/// Messages go out exactly as given; the router adds the identity frame on
/// its side and strips it from replies.
pub struct DealerSocket {
    endpoint: Endpoint,
    framed: Framed<BoxedStream, MultipartCodec>,
}

impl DealerSocket {
    /// Connect with default frame limits.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        Self::connect_with_config(endpoint, FrameConfig::default()).await
    }

    /// Connect with explicit frame limits.
    pub async fn connect_with_config(endpoint: &Endpoint, config: FrameConfig) -> Result<Self> {
        let connect_error = |source: std::io::Error| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let stream: BoxedStream = match endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(connect_error)?;
                stream.set_nodelay(true).map_err(connect_error)?;
                Box::new(stream)
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => Box::new(crate::uds::connect(path).await.map_err(connect_error)?),
            #[cfg(target_os = "linux")]
            Endpoint::Abstract(name) => {
                Box::new(crate::uds::connect_abstract(name).map_err(connect_error)?)
            }
            #[allow(unreachable_patterns)]
            _ => return Err(TransportError::InvalidEndpoint(endpoint.to_string())),
        };

        debug!(%endpoint, "dealer connected");
        Ok(Self {
            endpoint: endpoint.clone(),
            framed: Framed::new(stream, MultipartCodec::with_config(config)),
        })
    }

    /// Send one multipart message.
    pub async fn send(&mut self, message: Multipart) -> Result<()> {
        self.framed.send(message).await?;
        Ok(())
    }

    /// Receive the next message; [`TransportError::Disconnected`] once the
    /// router closes the connection.
    pub async fn recv(&mut self) -> Result<Multipart> {
        match self.framed.next().await {
            Some(message) => Ok(message?),
            None => Err(TransportError::Disconnected),
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Multipart> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    /// The endpoint this socket is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for DealerSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealerSocket")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
