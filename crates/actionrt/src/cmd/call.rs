use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use actionrt::frame::Multipart;
use actionrt::server::{unpack, Command, ReplyEnvelope};
use actionrt::transport::{DealerSocket, Endpoint};
use serde_json::{Map, Value};

use crate::cmd::CallArgs;
use actionrt::exit::{
    codec_error, io_error, transport_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS,
    USAGE,
};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let endpoint: Endpoint = args
        .endpoint
        .parse()
        .map_err(|err| transport_error("invalid endpoint", err))?;
    let request_id = args.request_id.clone().unwrap_or_else(generate_request_id);
    let message = build_request(&args, &request_id)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let started = Instant::now();
    let reply = runtime.block_on(async {
        let mut dealer = DealerSocket::connect(&endpoint)
            .await
            .map_err(|err| transport_error("connect failed", err))?;
        dealer
            .send(message)
            .await
            .map_err(|err| transport_error("send failed", err))?;
        dealer
            .recv_timeout(timeout)
            .await
            .map_err(|err| transport_error("receive failed", err))
    })?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let body = reply
        .get(1)
        .cloned()
        .ok_or_else(|| CliError::new(DATA_INVALID, "reply has no body frame"))?;
    let envelope: ReplyEnvelope =
        unpack(&body).map_err(|err| codec_error("invalid reply", err))?;

    print_reply(
        &endpoint.to_string(),
        &args.action,
        &envelope,
        &body,
        elapsed_ms,
        format,
    );

    Ok(if envelope.is_error() { FAILURE } else { SUCCESS })
}

fn build_request(args: &CallArgs, request_id: &str) -> CliResult<Multipart> {
    let mut message = Multipart::from_parts([
        String::new(),
        request_id.to_string(),
        args.action.clone(),
    ]);

    let schema = args
        .schema
        .as_deref()
        .map(|schema| parse_json("--schema", schema))
        .transpose()?;
    let params = args
        .params
        .as_deref()
        .map(|params| match parse_json("--params", params)? {
            Value::Object(map) => Ok(map),
            _ => Err(CliError::new(USAGE, "--params must be a JSON object")),
        })
        .transpose()?;

    if schema.is_none() && params.is_none() {
        return Ok(message);
    }

    message.push(schema.map(|schema| schema.to_string()).unwrap_or_default());
    if let Some(params) = params {
        message.push(encode_command(&args.action, params)?);
    }
    Ok(message)
}

fn encode_command(action: &str, params: Map<String, Value>) -> CliResult<Vec<u8>> {
    let command = Command {
        name: action.to_string(),
        params,
        meta: Map::new(),
    };
    serde_json::to_vec(&command)
        .map_err(|err| CliError::new(DATA_INVALID, format!("failed to encode command: {err}")))
}

fn parse_json(flag: &str, input: &str) -> CliResult<Value> {
    serde_json::from_str(input)
        .map_err(|err| CliError::new(USAGE, format!("{flag} is not valid JSON: {err}")))
}

fn generate_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("call-{}-{nanos}", std::process::id())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
