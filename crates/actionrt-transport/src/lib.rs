//! Multipart socket transport for actionrt components.
//!
//! Provides ROUTER/DEALER style sockets on top of local and network streams:
//! - TCP (`tcp://host:port`)
//! - Unix domain sockets (`ipc:///path/to.sock`)
//! - Linux abstract sockets (`ipc://@name`)
//!
//! A [`RouterSocket`] tags every inbound message with the identity of the
//! connection it arrived on and routes replies back by that identity. All
//! sockets bound under one [`TransportContext`] stop together when the
//! context is terminated.

pub mod context;
pub mod dealer;
pub mod endpoint;
pub mod error;
pub mod router;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use context::TransportContext;
pub use dealer::DealerSocket;
pub use endpoint::{ipc_name, Endpoint, DEFAULT_TCP_HOST, IPC_NAME_PREFIX};
pub use error::{Result, TransportError};
pub use router::{
    RouterOptions, RouterSocket, ACCEPT_ERROR_BACKOFF, DEFAULT_RECEIVE_HWM, DEFAULT_SEND_HWM,
};
pub use stream::{BoxedStream, IoStream};

#[cfg(unix)]
pub use uds::UdsListener;

pub use actionrt_frame::{FrameConfig, Multipart};
