use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};

use crate::codec;
use crate::component::Component;
use crate::config::{LateReplyPolicy, ServerConfig};
use crate::error::RequestError;
use crate::message::InboundMessage;
use crate::payload::{Command, SchemaMapping};
use crate::state::{ReplySink, RequestOutput, RequestState};
use crate::stats::{bump, ReactorStats};

/// Turns accepted messages into running handlers.
///
/// `dispatch` runs inline in the reactor and never waits on handler work.
pub(crate) struct Dispatcher {
    component: Arc<Component>,
    title: Arc<str>,
    timeout: Duration,
    late_replies: LateReplyPolicy,
    variables: Arc<BTreeMap<String, String>>,
    shutdown: CancellationToken,
    outputs: mpsc::Sender<RequestOutput>,
    stats: Arc<ReactorStats>,
    span: Span,
}

impl Dispatcher {
    pub(crate) fn new(
        component: Arc<Component>,
        config: &ServerConfig,
        shutdown: CancellationToken,
        outputs: mpsc::Sender<RequestOutput>,
        stats: Arc<ReactorStats>,
        span: Span,
    ) -> Self {
        Self {
            component,
            title: Arc::from(config.title.as_str()),
            timeout: config.timeout,
            late_replies: config.late_replies,
            variables: Arc::clone(&config.variables),
            shutdown,
            outputs,
            stats,
            span,
        }
    }

    pub(crate) fn dispatch(&self, message: InboundMessage, schemas: Arc<SchemaMapping>) {
        let span = info_span!(
            parent: &self.span,
            "request",
            request_id = %message.request_id(),
            action = %message.action(),
        );
        let started = Instant::now();
        let mut state = RequestState {
            identity: message.identity().clone(),
            request_id: message.request_id().to_string(),
            action: message.action().to_string(),
            component_title: Arc::clone(&self.title),
            command: Arc::default(),
            schemas,
            variables: Arc::clone(&self.variables),
            started,
            deadline: started + self.timeout,
            token: self.shutdown.child_token(),
            span: span.clone(),
        };

        let Some(handler) = self.component.handler(message.action()) else {
            let error = RequestError::UnknownAction {
                title: self.title.to_string(),
                action: state.action.clone(),
            };
            span.in_scope(|| debug!("unknown action"));
            self.emit(RequestOutput::failed(state, error));
            return;
        };

        if let Some(payload) = message.payload() {
            match codec::unpack::<Command>(payload) {
                Ok(command) => state.command = Arc::new(command),
                Err(err) => {
                    span.in_scope(|| error!(error = %err, "Failed to read payload"));
                    let error = RequestError::InvalidPayload {
                        title: self.title.to_string(),
                        action: state.action.clone(),
                    };
                    self.emit(RequestOutput::failed(state, error));
                    return;
                }
            }
        }

        bump(&self.stats.requests_dispatched);

        let (sink, outcome) = ReplySink::new(state.clone());
        let watch = Watch {
            token: state.token.clone(),
            started,
            deadline: state.deadline,
            timeout: self.timeout,
            late_replies: self.late_replies,
            shutdown: self.shutdown.clone(),
            outputs: self.outputs.clone(),
            stats: Arc::clone(&self.stats),
        };

        tokio::spawn(handler.call(state, sink).instrument(span.clone()));
        tokio::spawn(watch.run(outcome).instrument(span));
    }

    /// Queue an output produced without running a handler.
    fn emit(&self, output: RequestOutput) {
        match self.outputs.try_send(output) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(output)) => {
                let outputs = self.outputs.clone();
                tokio::spawn(async move {
                    let _ = outputs.send(output).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Waits for one handler outcome under the request deadline.
struct Watch {
    token: CancellationToken,
    started: Instant,
    deadline: Instant,
    timeout: Duration,
    late_replies: LateReplyPolicy,
    shutdown: CancellationToken,
    outputs: mpsc::Sender<RequestOutput>,
    stats: Arc<ReactorStats>,
}

impl Watch {
    async fn run(self, mut outcome: oneshot::Receiver<RequestOutput>) {
        tokio::select! {
            biased;

            received = &mut outcome => {
                self.token.cancel();
                match received {
                    Ok(output) => {
                        let _ = self.outputs.send(output).await;
                    }
                    Err(_) => {
                        bump(&self.stats.abandoned);
                        warn!(
                            elapsed_ms = elapsed_ms(self.started),
                            "handler finished without replying"
                        );
                    }
                }
            }

            () = tokio::time::sleep_until(self.deadline) => {
                self.token.cancel();
                bump(&self.stats.timeouts);
                warn!(
                    elapsed_ms = elapsed_ms(self.started),
                    pid = std::process::id(),
                    "Execution timed out after {}ms",
                    self.timeout.as_millis()
                );
                if self.late_replies == LateReplyPolicy::Log {
                    self.observe_late(outcome).await;
                }
            }

            () = self.shutdown.cancelled() => {
                self.token.cancel();
                debug!("server stopping; no longer waiting for handler");
            }
        }
    }

    async fn observe_late(&self, outcome: oneshot::Receiver<RequestOutput>) {
        tokio::select! {
            received = outcome => {
                if let Ok(output) = received {
                    bump(&self.stats.late_replies);
                    warn!(
                        elapsed_ms = elapsed_ms(self.started),
                        failed = output.error.is_some(),
                        error = output.error.as_ref().map(tracing::field::display),
                        "late reply discarded"
                    );
                }
            }
            () = self.shutdown.cancelled() => {}
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
