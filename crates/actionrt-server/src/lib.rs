//! Request reactor for actionrt components.
//!
//! A [`Server`] binds a router socket, validates every inbound multipart
//! request, runs the matching action handler of a [`Component`] under a
//! deadline, and writes the correlated reply back to the requesting peer.
//!
//! ```no_run
//! use actionrt_server::{Component, ComponentInfo, ComponentKind, ServerConfig, Server};
//! use actionrt_transport::{Endpoint, TransportContext};
//!
//! # async fn demo() -> Result<(), actionrt_server::ServerError> {
//! let component = Component::new().action("hello", |_state, sink| async move {
//!     sink.reply(&"world");
//! });
//! let info = ComponentInfo::new(ComponentKind::Service, "greeter", "1.0.0");
//! let config = ServerConfig::new(info.title(), Endpoint::tcp_local(5010));
//! Server::new(component, config).run(&TransportContext::new()).await
//! # }
//! ```

pub mod codec;
pub mod component;
pub mod config;
mod dispatch;
pub mod error;
pub mod message;
pub mod payload;
mod reactor;
pub mod response;
pub mod server;
pub mod state;
pub mod stats;

pub use codec::{pack, unpack, CodecError};
pub use component::{ActionHandler, ActionRegistry, Component, ComponentInfo, ComponentKind};
pub use config::{
    LateReplyPolicy, ServerConfig, DEFAULT_OUTPUT_CAPACITY, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT,
};
pub use error::{RequestError, Result, ServerError};
pub use message::{validate, InboundMessage, ValidationError};
pub use payload::{Command, ReplyEnvelope, ReplyError, SchemaMapping};
pub use server::{BoundServer, Server};
pub use state::{ReplySink, RequestOutput, RequestState};
pub use stats::{ReactorStats, StatsSnapshot};
