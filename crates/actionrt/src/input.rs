//! Command-line input of a component process.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Args, ValueEnum};

use actionrt_server::{ComponentInfo, ComponentKind, LateReplyPolicy, ServerConfig};
use actionrt_transport::{Endpoint, TransportError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ComponentArg {
    Service,
    Middleware,
}

impl From<ComponentArg> for ComponentKind {
    fn from(arg: ComponentArg) -> Self {
        match arg {
            ComponentArg::Service => ComponentKind::Service,
            ComponentArg::Middleware => ComponentKind::Middleware,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LateRepliesArg {
    Discard,
    Log,
}

impl From<LateRepliesArg> for LateReplyPolicy {
    fn from(arg: LateRepliesArg) -> Self {
        match arg {
            LateRepliesArg::Discard => LateReplyPolicy::Discard,
            LateRepliesArg::Log => LateReplyPolicy::Log,
        }
    }
}

/// Arguments a component process is started with.
#[derive(Args, Debug, Clone)]
pub struct Input {
    /// Component type.
    #[arg(
        short = 'c',
        long,
        value_enum,
        default_value = "service",
        env = "ACTIONRT_COMPONENT"
    )]
    pub component: ComponentArg,

    /// Component name.
    #[arg(short = 'n', long, env = "ACTIONRT_NAME")]
    pub name: String,

    /// Component version.
    #[arg(short = 'v', long = "version", env = "ACTIONRT_VERSION")]
    pub component_version: String,

    /// Version of the framework running the component.
    #[arg(short = 'p', long, env = "ACTIONRT_FRAMEWORK_VERSION")]
    pub framework_version: Option<String>,

    /// Local socket name to listen on (`@name` for an abstract socket).
    #[arg(short = 's', long, env = "ACTIONRT_SOCKET")]
    pub socket: Option<String>,

    /// Listen on this TCP port on 127.0.0.1 instead of a local socket.
    #[arg(short = 't', long, env = "ACTIONRT_TCP")]
    pub tcp: Option<u16>,

    /// Handler deadline in milliseconds.
    #[arg(short = 'T', long, default_value_t = 30_000, env = "ACTIONRT_TIMEOUT")]
    pub timeout: u64,

    /// Component variable as KEY=VALUE (repeatable).
    #[arg(short = 'V', long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Enable debug logging.
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// What to do with handler results that arrive after the deadline.
    #[arg(long, value_enum, default_value = "discard", env = "ACTIONRT_LATE_REPLIES")]
    pub late_replies: LateRepliesArg,
}

impl Input {
    pub fn component_info(&self) -> ComponentInfo {
        let info = ComponentInfo::new(
            self.component.into(),
            self.name.clone(),
            self.component_version.clone(),
        );
        match &self.framework_version {
            Some(version) => info.with_framework_version(version.clone()),
            None => info,
        }
    }

    /// Address to listen on: TCP when a port is given, then the socket
    /// name, then a name derived from the component identity.
    pub fn endpoint(&self) -> Result<Endpoint, TransportError> {
        if let Some(port) = self.tcp {
            return Ok(Endpoint::tcp_local(port));
        }
        if let Some(name) = self.socket.as_deref().filter(|name| !name.is_empty()) {
            return Endpoint::ipc(name);
        }
        Ok(Endpoint::default_ipc(&self.component_info().address_parts()))
    }

    pub fn variables(&self) -> BTreeMap<String, String> {
        self.vars.iter().cloned().collect()
    }

    pub fn server_config(&self) -> Result<ServerConfig, TransportError> {
        Ok(
            ServerConfig::new(self.component_info().title(), self.endpoint()?)
                .with_timeout(Duration::from_millis(self.timeout))
                .with_late_replies(self.late_replies.into())
                .with_variables(self.variables()),
        )
    }
}

fn parse_var(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{input}'")),
    }
}
