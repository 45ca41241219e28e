use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use actionrt_server::{Component, Server, ServerError};
use actionrt_transport::{TransportContext, TransportError};

use crate::exit::{exit_code, run_error, SUCCESS};
use crate::input::Input;
use crate::logging::{init_logging, LogArgs};

/// Errors that end a component process.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The process input does not describe a usable endpoint.
    #[error("invalid input: {0}")]
    Input(#[source] TransportError),

    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

#[derive(Parser, Debug)]
#[command(about = "actionrt component")]
struct RunnerCli {
    #[command(flatten)]
    input: Input,

    #[command(flatten)]
    logging: LogArgs,
}

/// Run `component` as a process: parse arguments, set up logging and serve
/// until a termination signal arrives.
///
/// The exit code follows [`crate::exit`]: a bad endpoint is a usage error
/// and a failed bind is a transport error.
pub fn run(component: Component) -> ExitCode {
    let cli = RunnerCli::parse();
    init_logging(
        cli.logging.log_format,
        cli.logging.effective_level(cli.input.debug),
    );

    exit_code(serve_status(component, &cli.input))
}

fn serve_status(component: Component, input: &Input) -> i32 {
    match serve(component, input) {
        Ok(()) => SUCCESS,
        Err(err) => {
            let failure = run_error("component failed", err);
            error!(code = failure.code, error = %failure, "Component failed");
            failure.code
        }
    }
}

/// Serve `component` with already parsed input on a new multi-thread runtime.
pub fn serve(component: Component, input: &Input) -> Result<(), RunError> {
    let config = input.server_config().map_err(RunError::Input)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RunError::Runtime)?;

    runtime.block_on(async move {
        let context = TransportContext::new();
        let signals = tokio::spawn(terminate_on_signal(context.clone()));
        let result = Server::new(component, config).run(&context).await;
        signals.abort();
        result.map_err(RunError::from)
    })
}

/// Terminate `context` on SIGHUP, SIGINT, SIGQUIT or SIGTERM.
pub async fn terminate_on_signal(context: TransportContext) {
    match wait_for_signal().await {
        Ok(signal) => {
            debug!(signal, "Termination signal received");
            context.terminate();
            debug!("Socket context terminated");
        }
        Err(err) => error!(error = %err, "failed to install signal handlers"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = hangup.recv() => "SIGHUP",
        _ = interrupt.recv() => "SIGINT",
        _ = quit.recv() => "SIGQUIT",
        _ = terminate.recv() => "SIGTERM",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_cli_accepts_input_and_log_flags() {
        let cli = RunnerCli::try_parse_from([
            "component",
            "-n",
            "users",
            "-v",
            "1.0.0",
            "--log-level",
            "warn",
            "-D",
        ])
        .expect("runner args should parse");
        assert_eq!(cli.input.name, "users");
        assert_eq!(
            cli.logging.effective_level(cli.input.debug),
            crate::logging::LogLevel::Debug
        );
    }

    #[test]
    fn runner_cli_requires_name_and_version() {
        let err = RunnerCli::try_parse_from(["component", "-n", "users"])
            .expect_err("missing version should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn serve_rejects_bad_socket_before_starting() {
        let cli = RunnerCli::try_parse_from(["component", "-n", "users", "-v", "1", "-s", "@"])
            .expect("args should parse");
        let err = serve(Component::new(), &cli.input).unwrap_err();
        assert!(matches!(err, RunError::Input(TransportError::InvalidEndpoint(_))));
    }

    #[test]
    fn bad_socket_exits_with_usage_code() {
        let cli = RunnerCli::try_parse_from(["component", "-n", "users", "-v", "1", "-s", "@"])
            .expect("args should parse");
        assert_eq!(serve_status(Component::new(), &cli.input), crate::exit::USAGE);
    }

    #[test]
    fn port_in_use_is_a_server_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = taken.local_addr().expect("local addr").port().to_string();
        let cli = RunnerCli::try_parse_from(["component", "-n", "users", "-v", "1", "-t", &port])
            .expect("args should parse");

        let err = serve(Component::new(), &cli.input).unwrap_err();
        assert!(
            matches!(err, RunError::Server(ServerError::Bind { .. })),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn port_in_use_exits_with_transport_code() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = taken.local_addr().expect("local addr").port().to_string();
        let cli = RunnerCli::try_parse_from(["component", "-n", "users", "-v", "1", "-t", &port])
            .expect("args should parse");
        assert_eq!(
            serve_status(Component::new(), &cli.input),
            crate::exit::TRANSPORT_ERROR
        );
    }
}
