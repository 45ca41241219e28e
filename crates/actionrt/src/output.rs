use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use actionrt::server::ReplyEnvelope;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    endpoint: &'a str,
    action: &'a str,
    request_id: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    elapsed_ms: u64,
}

/// Print one reply received by `call`.
pub fn print_reply(
    endpoint: &str,
    action: &str,
    envelope: &ReplyEnvelope,
    raw: &[u8],
    elapsed_ms: u64,
    format: OutputFormat,
) {
    let error = envelope.error.as_ref().map(|error| error.message.as_str());
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                endpoint,
                action,
                request_id: &envelope.request_id,
                ok: !envelope.is_error(),
                result: envelope.result.as_ref(),
                error,
                elapsed_ms,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["REQUEST", "ACTION", "STATUS", "ELAPSED", "BODY"])
                .add_row(vec![
                    envelope.request_id.clone(),
                    action.to_string(),
                    status(envelope).to_string(),
                    format!("{elapsed_ms}ms"),
                    body(envelope),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "request={} action={} status={} elapsed={}ms body={}",
                envelope.request_id,
                action,
                status(envelope),
                elapsed_ms,
                body(envelope)
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn status(envelope: &ReplyEnvelope) -> &'static str {
    if envelope.is_error() {
        "error"
    } else {
        "ok"
    }
}

fn body(envelope: &ReplyEnvelope) -> String {
    match (&envelope.error, &envelope.result) {
        (Some(error), _) => error.message.clone(),
        (None, Some(result)) => result.to_string(),
        (None, None) => String::new(),
    }
}
