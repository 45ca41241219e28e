//! Component runtime for actionrt.
//!
//! A component registers named actions and hands itself to [`run`], which
//! parses the process arguments, sets up logging, binds the component's
//! socket and serves requests until a termination signal arrives.
//!
//! ```no_run
//! use actionrt::{Component, ReplySink, RequestState};
//!
//! fn main() -> std::process::ExitCode {
//!     let component = Component::new().action("greet", |state: RequestState, sink: ReplySink| async move {
//!         let name = state.command().param("name").cloned();
//!         sink.reply(&serde_json::json!({ "hello": name }));
//!     });
//!     actionrt::run(component)
//! }
//! ```
//!
//! # Crate Structure
//!
//! - [`frame`]: Multipart message framing
//! - [`transport`]: Router/dealer sockets over TCP and Unix domain sockets
//! - [`server`]: The request reactor
//! - [`input`], [`logging`]: Process arguments and log setup (behind `runner` feature)
//! - [`exit`]: Exit codes for component and CLI processes (behind `runner` feature)

/// Re-export frame types.
pub mod frame {
    pub use actionrt_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use actionrt_transport::*;
}

/// Re-export server types.
pub mod server {
    pub use actionrt_server::*;
}

pub use actionrt_server::{
    Command, Component, ComponentInfo, ComponentKind, LateReplyPolicy, ReplySink, RequestState,
    Server, ServerConfig,
};

#[cfg(feature = "runner")]
pub mod exit;
#[cfg(feature = "runner")]
pub mod input;
#[cfg(feature = "runner")]
pub mod logging;
#[cfg(feature = "runner")]
mod runner;

#[cfg(feature = "runner")]
pub use input::Input;
#[cfg(feature = "runner")]
pub use runner::{run, serve, terminate_on_signal, RunError};
