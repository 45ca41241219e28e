use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, Span};

use actionrt_frame::Multipart;
use actionrt_transport::{RouterSocket, TransportContext, TransportError};

use crate::codec;
use crate::dispatch::Dispatcher;
use crate::error::RequestError;
use crate::message::{validate, InboundMessage, ValidationError};
use crate::payload::SchemaMapping;
use crate::response;
use crate::state::RequestOutput;
use crate::stats::{bump, ReactorStats};

/// The event loop: reads requests, dispatches them, writes finished replies.
pub(crate) struct Reactor {
    pub(crate) socket: RouterSocket,
    pub(crate) context: TransportContext,
    pub(crate) outputs: mpsc::Receiver<RequestOutput>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) schemas: Arc<SchemaMapping>,
    pub(crate) title: String,
    pub(crate) poll_interval: Duration,
    pub(crate) stats: Arc<ReactorStats>,
    pub(crate) span: Span,
}

impl Reactor {
    /// Run until the transport context is terminated.
    pub(crate) async fn run(mut self) {
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Finished requests are written before new ones are read.
            let step = tokio::select! {
                biased;

                Some(output) = self.outputs.recv() => self.write_output(output),

                received = self.socket.recv() => match received {
                    Ok(message) => self.handle_message(message),
                    Err(err) => Err(err),
                },

                _ = tick.tick() => {
                    if self.context.is_terminated() {
                        Err(TransportError::Terminated)
                    } else {
                        Ok(())
                    }
                }
            };

            match step {
                Ok(()) => {}
                Err(err) if err.is_terminal() => {
                    self.span.in_scope(|| debug!("transport context terminated"));
                    break;
                }
                Err(err) => {
                    self.span
                        .in_scope(|| error!(error = %err, "Failed to process socket event"));
                }
            }
        }

        self.socket.unbind().await;
    }

    fn handle_message(&mut self, message: Multipart) -> Result<(), TransportError> {
        bump(&self.stats.messages_received);

        match validate(message) {
            Ok(inbound) => {
                self.apply_schemas(&inbound);
                self.dispatcher.dispatch(inbound, Arc::clone(&self.schemas));
                Ok(())
            }
            Err(ValidationError::Unaddressable(reason)) => {
                bump(&self.stats.messages_dropped);
                self.span
                    .in_scope(|| error!(reason, "Dropping invalid request message"));
                Ok(())
            }
            Err(ValidationError::Malformed {
                identity,
                request_id,
                reason,
            }) => {
                let error = RequestError::Malformed {
                    title: self.title.clone(),
                    reason: reason.to_string(),
                };
                self.span
                    .in_scope(|| error!(%request_id, reason, "Invalid request message"));
                self.send_error(identity, &request_id, &error, &self.span)
            }
        }
    }

    /// Replace the schema snapshot when the message carries a different one.
    fn apply_schemas(&mut self, inbound: &InboundMessage) {
        let Some(blob) = inbound.schema() else {
            return;
        };
        match codec::unpack::<SchemaMapping>(blob) {
            Ok(mapping) if mapping == *self.schemas => {}
            Ok(mapping) => {
                self.span
                    .in_scope(|| debug!(entries = mapping.len(), "schemas updated"));
                self.schemas = Arc::new(mapping);
            }
            Err(err) => {
                self.span
                    .in_scope(|| error!(error = %err, "Failed to read schemas"));
            }
        }
    }

    fn write_output(&self, output: RequestOutput) -> Result<(), TransportError> {
        let RequestOutput {
            state,
            error,
            response,
        } = output;

        match (error, response) {
            (Some(error), _) if !error.is_replied() => {
                bump(&self.stats.serialization_failures);
                state
                    .span
                    .in_scope(|| error!(error = %error, "Failed to create response"));
                Ok(())
            }
            (Some(error), _) => {
                self.send_error(state.identity.clone(), &state.request_id, &error, &state.span)
            }
            (None, Some(reply)) => self.send_reply(state.identity.clone(), reply, &state.span),
            (None, None) => {
                let error = RequestError::Handler("Handler produced no reply".to_string());
                self.send_error(state.identity.clone(), &state.request_id, &error, &state.span)
            }
        }
    }

    fn send_error(
        &self,
        identity: Bytes,
        request_id: &str,
        error: &RequestError,
        span: &Span,
    ) -> Result<(), TransportError> {
        let reply = match response::build_error(request_id, &error.to_string()) {
            Ok(reply) => reply,
            Err(err) => {
                bump(&self.stats.serialization_failures);
                span.in_scope(|| {
                    error!(error = %error, "Request failed");
                    error!(error = %err, "Failed to create error response");
                });
                return Ok(());
            }
        };
        bump(&self.stats.error_replies);
        self.send_reply(identity, reply, span)
    }

    fn send_reply(&self, identity: Bytes, reply: Bytes, span: &Span) -> Result<(), TransportError> {
        match self.socket.send(response::frames(identity, reply)) {
            Ok(()) => {
                bump(&self.stats.replies_sent);
                Ok(())
            }
            Err(err) if err.is_terminal() => Err(err),
            Err(err) => {
                bump(&self.stats.send_failures);
                span.in_scope(|| error!(error = %err, "Failed to send response to client"));
                Ok(())
            }
        }
    }
}
