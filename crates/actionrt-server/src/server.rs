use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, info_span, Span};

use actionrt_transport::{Endpoint, RouterSocket, TransportContext, TransportError};

use crate::component::Component;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{Result, ServerError};
use crate::reactor::Reactor;
use crate::stats::ReactorStats;

/// Serves one component on one endpoint.
pub struct Server {
    component: Arc<Component>,
    config: ServerConfig,
    stats: Arc<ReactorStats>,
    span: Span,
}

impl Server {
    /// Create a server logging under a span named after the component.
    pub fn new(component: Component, config: ServerConfig) -> Self {
        let span = info_span!("component", title = %config.title);
        Self {
            component: Arc::new(component),
            config,
            stats: Arc::new(ReactorStats::new()),
            span,
        }
    }

    /// Log under `span` instead; request spans become its children.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Counters updated while the server runs.
    pub fn stats(&self) -> Arc<ReactorStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the listening socket without serving yet.
    pub async fn bind(self, context: &TransportContext) -> Result<BoundServer> {
        let endpoint = &self.config.endpoint;
        self.span
            .in_scope(|| debug!(%endpoint, "Listening for requests"));

        let socket = RouterSocket::bind(endpoint, context, self.config.router_options())
            .await
            .map_err(|source| match source {
                TransportError::Terminated => ServerError::Terminated,
                source => ServerError::Bind {
                    endpoint: endpoint.to_string(),
                    source,
                },
            })?;

        Ok(BoundServer {
            server: self,
            socket,
            context: context.clone(),
        })
    }

    /// Bind and serve until `context` is terminated.
    pub async fn run(self, context: &TransportContext) -> Result<()> {
        self.bind(context).await?.run().await
    }
}

/// A server whose socket is open.
pub struct BoundServer {
    server: Server,
    socket: RouterSocket,
    context: TransportContext,
}

impl BoundServer {
    /// The endpoint actually bound, with any ephemeral TCP port resolved.
    pub fn local_endpoint(&self) -> &Endpoint {
        self.socket.local_endpoint()
    }

    pub fn stats(&self) -> Arc<ReactorStats> {
        self.server.stats()
    }

    /// Serve until the transport context is terminated.
    pub async fn run(self) -> Result<()> {
        let BoundServer {
            server,
            socket,
            context,
        } = self;
        let Server {
            component,
            config,
            stats,
            span,
        } = server;

        let (outputs_tx, outputs) = mpsc::channel(config.output_capacity.max(1));
        let dispatcher = Dispatcher::new(
            component,
            &config,
            context.child_token(),
            outputs_tx,
            Arc::clone(&stats),
            span.clone(),
        );

        let reactor = Reactor {
            socket,
            context,
            outputs,
            dispatcher,
            schemas: Arc::default(),
            title: config.title.clone(),
            poll_interval: config.poll_interval,
            stats: Arc::clone(&stats),
            span: span.clone(),
        };
        reactor.run().await;

        span.in_scope(|| info!(stats = ?stats.snapshot(), "Component stopped"));
        Ok(())
    }
}
