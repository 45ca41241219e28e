use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::error::RequestError;
use crate::payload::{Command, SchemaMapping};
use crate::response;

/// Everything a handler knows about the request it serves.
///
/// Cloning is cheap: the command, schemas and variables are shared.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub(crate) identity: Bytes,
    pub(crate) request_id: String,
    pub(crate) action: String,
    pub(crate) component_title: Arc<str>,
    pub(crate) command: Arc<Command>,
    pub(crate) schemas: Arc<SchemaMapping>,
    pub(crate) variables: Arc<BTreeMap<String, String>>,
    pub(crate) started: Instant,
    pub(crate) deadline: Instant,
    pub(crate) token: CancellationToken,
    pub(crate) span: Span,
}

impl RequestState {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Transport identity of the requesting peer.
    pub fn peer_identity(&self) -> &Bytes {
        &self.identity
    }

    pub fn component_title(&self) -> &str {
        &self.component_title
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Schema snapshot current when the request was dispatched.
    pub fn schemas(&self) -> &Arc<SchemaMapping> {
        &self.schemas
    }

    /// Value of a component variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Cancelled at the deadline or on server shutdown.
    ///
    /// Handlers that want to stop early select on
    /// [`cancelled`](CancellationToken::cancelled); nothing forces them to.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Span tagged with the request id; handler tasks run inside it.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Outcome of one request, consumed once by the reactor.
#[derive(Debug)]
pub struct RequestOutput {
    pub state: RequestState,
    pub error: Option<RequestError>,
    /// Serialized reply. Ignored when `error` is set.
    pub response: Option<Bytes>,
}

impl RequestOutput {
    pub fn reply(state: RequestState, response: Bytes) -> Self {
        Self {
            state,
            error: None,
            response: Some(response),
        }
    }

    pub fn failed(state: RequestState, error: RequestError) -> Self {
        Self {
            state,
            error: Some(error),
            response: None,
        }
    }
}

/// One-shot channel a handler answers through.
#[derive(Debug)]
pub struct ReplySink {
    state: RequestState,
    tx: oneshot::Sender<RequestOutput>,
}

impl ReplySink {
    pub(crate) fn new(state: RequestState) -> (Self, oneshot::Receiver<RequestOutput>) {
        let (tx, rx) = oneshot::channel();
        (Self { state, tx }, rx)
    }

    /// Answer with a serializable result.
    pub fn reply<T: Serialize + ?Sized>(self, result: &T) {
        let encoded = serde_json::to_value(result)
            .map_err(|err| err.to_string())
            .and_then(|value| {
                response::build_reply(&self.state.request_id, value).map_err(|err| err.to_string())
            });
        self.deliver(|state| match encoded {
            Ok(bytes) => RequestOutput::reply(state, bytes),
            Err(err) => RequestOutput::failed(state, RequestError::Serialization(err)),
        });
    }

    /// Answer with an error message.
    pub fn fail(self, message: impl Into<String>) {
        let error = RequestError::Handler(message.into());
        self.deliver(|state| RequestOutput::failed(state, error));
    }

    /// Answer with an already serialized reply.
    pub fn send(self, response: Bytes) {
        self.deliver(|state| RequestOutput::reply(state, response));
    }

    /// Whether nobody is waiting for the answer any more.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn deliver(self, output: impl FnOnce(RequestState) -> RequestOutput) {
        // A closed channel means the deadline already passed.
        let _ = self.tx.send(output(self.state));
    }
}
