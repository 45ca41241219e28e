use clap::{Args, Subcommand};

use actionrt::Input;

use actionrt::exit::CliResult;
use crate::output::OutputFormat;

pub mod address;
pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in demo component.
    Serve(ServeArgs),
    /// Send one request to a component and print the reply.
    Call(CallArgs),
    /// Print the address a component would listen on.
    Address(AddressArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Address(args) => address::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub input: Input,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Component address (tcp://host:port, ipc:///path or ipc://@name).
    pub endpoint: String,
    /// Action to invoke.
    pub action: String,
    /// Action parameters as a JSON object.
    #[arg(long, short = 'j')]
    pub params: Option<String>,
    /// Schema mapping to send along with the request, as JSON.
    #[arg(long)]
    pub schema: Option<String>,
    /// Request id. Default: generated.
    #[arg(long)]
    pub request_id: Option<String>,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    #[command(flatten)]
    pub input: Input,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
