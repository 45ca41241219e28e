use crate::cmd::AddressArgs;
use actionrt::exit::{transport_error, CliResult, SUCCESS};

pub fn run(args: AddressArgs) -> CliResult<i32> {
    let endpoint = args
        .input
        .endpoint()
        .map_err(|err| transport_error("invalid address", err))?;
    println!("{endpoint}");
    Ok(SUCCESS)
}
