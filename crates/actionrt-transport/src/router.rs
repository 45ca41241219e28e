use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use actionrt_frame::{FrameConfig, FrameError, Multipart, MultipartCodec};

use crate::context::TransportContext;
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::BoxedStream;

#[cfg(unix)]
use crate::uds::UdsListener;

/// Default capacity of the shared inbound queue.
pub const DEFAULT_RECEIVE_HWM: usize = 1000;

/// Default capacity of each peer's outbound queue.
pub const DEFAULT_SEND_HWM: usize = 1000;

/// Pause after a failed accept before trying again.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Tuning for a [`RouterSocket`].
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    /// Messages buffered across all peers before readers stop pulling.
    pub receive_hwm: usize,
    /// Messages buffered per peer before `send` reports backpressure.
    pub send_hwm: usize,
    /// Frame size and part-count limits.
    pub frame: FrameConfig,
    /// Permission mode for filesystem socket paths.
    pub socket_mode: u32,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            receive_hwm: DEFAULT_RECEIVE_HWM,
            send_hwm: DEFAULT_SEND_HWM,
            frame: FrameConfig::default(),
            socket_mode: 0o600,
        }
    }
}

impl RouterOptions {
    /// Set the inbound queue capacity.
    pub fn with_receive_hwm(mut self, hwm: usize) -> Self {
        self.receive_hwm = hwm.max(1);
        self
    }

    /// Set the per-peer outbound queue capacity.
    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm.max(1);
        self
    }

    /// Set frame limits.
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }
}

type PeerTable = DashMap<Bytes, mpsc::Sender<Multipart>>;

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UdsListener),
}

impl Listener {
    async fn bind(endpoint: &Endpoint, options: &RouterOptions) -> Result<(Self, Endpoint)> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(|source| TransportError::Bind {
                        endpoint: endpoint.to_string(),
                        source,
                    })?;
                let local = listener.local_addr()?;
                info!(%local, "listening on tcp");
                let resolved = Endpoint::Tcp {
                    host: host.clone(),
                    port: local.port(),
                };
                Ok((Listener::Tcp(listener), resolved))
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                let listener = UdsListener::bind_with_mode(path, options.socket_mode)?;
                Ok((Listener::Unix(listener), endpoint.clone()))
            }
            #[cfg(target_os = "linux")]
            Endpoint::Abstract(name) => {
                let listener = UdsListener::bind_abstract(name)?;
                Ok((Listener::Unix(listener), endpoint.clone()))
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = options;
                Err(TransportError::InvalidEndpoint(endpoint.to_string()))
            }
        }
    }

    async fn accept(&self) -> Result<BoxedStream> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await.map_err(TransportError::Accept)?;
                stream.set_nodelay(true)?;
                debug!(%addr, "accepted tcp connection");
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Listener::Unix(listener) => Ok(Box::new(listener.accept().await?)),
        }
    }
}

/// Server socket that routes messages by connection identity.
///
/// Every accepted connection is assigned an identity of the form
/// `peer-<n>`. Inbound messages are delivered with that identity prepended
/// as frame 0; [`send`](Self::send) pops frame 0 and routes the rest of the
/// message to the matching connection.
///
/// Queued outbound messages are not flushed on shutdown (zero linger).
pub struct RouterSocket {
    endpoint: Endpoint,
    inbound: mpsc::Receiver<Multipart>,
    peers: Arc<PeerTable>,
    shutdown: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
}

impl RouterSocket {
    /// Bind to `endpoint` under `context` and start accepting connections.
    pub async fn bind(
        endpoint: &Endpoint,
        context: &TransportContext,
        options: RouterOptions,
    ) -> Result<Self> {
        if context.is_terminated() {
            return Err(TransportError::Terminated);
        }

        let (listener, resolved) = Listener::bind(endpoint, &options).await?;
        let (inbound_tx, inbound) = mpsc::channel(options.receive_hwm.max(1));
        let peers = Arc::new(PeerTable::new());
        let shutdown = context.child_token();

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&peers),
            inbound_tx,
            shutdown.clone(),
            options,
        ));

        Ok(Self {
            endpoint: resolved,
            inbound,
            peers,
            shutdown,
            accept_task: Some(accept_task),
        })
    }

    /// Receive the next message, identity frame first.
    ///
    /// Cancellation safe. Fails with [`TransportError::Terminated`] once the
    /// context is terminated or the socket is unbound.
    pub async fn recv(&mut self) -> Result<Multipart> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(TransportError::Terminated),
            message = self.inbound.recv() => message.ok_or(TransportError::Terminated),
        }
    }

    /// Queue `message` for the peer named by its first frame.
    ///
    /// Never waits: a full peer queue is reported as
    /// [`TransportError::PeerBackpressure`] and the message is dropped.
    pub fn send(&self, mut message: Multipart) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Terminated);
        }
        let identity = message
            .pop_front()
            .ok_or(TransportError::Frame(FrameError::EmptyMessage))?;
        if message.is_empty() {
            return Err(TransportError::Frame(FrameError::EmptyMessage));
        }

        let peer = self
            .peers
            .get(&identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownPeer(display_identity(&identity)))?;

        peer.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                TransportError::PeerBackpressure(display_identity(&identity))
            }
            mpsc::error::TrySendError::Closed(_) => {
                TransportError::UnknownPeer(display_identity(&identity))
            }
        })
    }

    /// Stop accepting, close every connection and release the endpoint.
    pub async fn unbind(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        debug!(endpoint = %self.endpoint, "router unbound");
    }

    /// The endpoint actually bound (TCP port 0 resolved to the real port).
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl Drop for RouterSocket {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for RouterSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterSocket")
            .field("endpoint", &self.endpoint)
            .field("peers", &self.peers.len())
            .finish()
    }
}

fn display_identity(identity: &Bytes) -> String {
    String::from_utf8_lossy(identity).into_owned()
}

async fn accept_loop(
    listener: Listener,
    peers: Arc<PeerTable>,
    inbound_tx: mpsc::Sender<Multipart>,
    shutdown: CancellationToken,
    options: RouterOptions,
) {
    let next_id = AtomicU64::new(1);

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                debug!("accept loop stopping");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok(stream) => {
                    let id = next_id.fetch_add(1, Ordering::Relaxed);
                    let identity = Bytes::from(format!("peer-{id}"));
                    let (outbound_tx, outbound_rx) = mpsc::channel(options.send_hwm.max(1));
                    peers.insert(identity.clone(), outbound_tx);
                    tokio::spawn(serve_connection(
                        stream,
                        identity,
                        outbound_rx,
                        Arc::clone(&peers),
                        inbound_tx.clone(),
                        shutdown.clone(),
                        options.frame,
                    ));
                }
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    if !pause_after_accept_error(&shutdown).await {
                        debug!("accept loop stopping");
                        break;
                    }
                }
            }
        }
    }

    peers.clear();
}

/// Wait out [`ACCEPT_ERROR_BACKOFF`] so a persistent accept error such as
/// descriptor exhaustion does not spin. Returns `false` if shutdown came first.
async fn pause_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
    }
}

async fn serve_connection(
    stream: BoxedStream,
    identity: Bytes,
    mut outbound: mpsc::Receiver<Multipart>,
    peers: Arc<PeerTable>,
    inbound: mpsc::Sender<Multipart>,
    shutdown: CancellationToken,
    frame: FrameConfig,
) {
    let peer = display_identity(&identity);
    debug!(%peer, "peer connected");

    let framed = Framed::new(stream, MultipartCodec::with_config(frame));
    let (mut writer, mut reader) = framed.split();

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            Some(message) = outbound.recv() => {
                if let Err(err) = writer.send(message).await {
                    warn!(%peer, error = %err, "failed to write to peer");
                    break;
                }
            }

            next = reader.next() => match next {
                Some(Ok(mut message)) => {
                    trace!(%peer, frames = message.len(), "received message");
                    message.push_front(identity.clone());
                    // Waiting here while the queue is full stops reading from
                    // the socket, which pushes back on the peer.
                    tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        sent = inbound.send(message) => if sent.is_err() { break },
                    }
                }
                Some(Err(err)) => {
                    warn!(%peer, error = %err, "dropping peer after framing error");
                    break;
                }
                None => break,
            }
        }
    }

    peers.remove(&identity);
    debug!(%peer, "peer disconnected");
}
