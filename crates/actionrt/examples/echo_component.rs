//! A minimal component with two actions.
//!
//! ```text
//! cargo run -p actionrt --example echo-component -- -n echo -v 1.0.0 -t 5010
//! actionrt call tcp://127.0.0.1:5010 echo --params '{"text":"hi"}'
//! ```

use std::process::ExitCode;
use std::time::Duration;

use serde_json::{json, Value};

use actionrt::{Component, ReplySink, RequestState};

async fn echo(state: RequestState, sink: ReplySink) {
    sink.reply(&Value::Object(state.command().params.clone()));
}

/// Counts down once per 100ms and replies with how far it got.
async fn countdown(state: RequestState, sink: ReplySink) {
    let mut left = state
        .command()
        .param("from")
        .and_then(Value::as_u64)
        .unwrap_or(3);
    let cancelled = state.cancellation();

    while left > 0 {
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => left -= 1,
            () = cancelled.cancelled() => return,
        }
    }
    let remaining_ms = u64::try_from(state.remaining().as_millis()).unwrap_or(u64::MAX);
    sink.reply(&json!({ "done": true, "remaining_ms": remaining_ms }));
}

fn main() -> ExitCode {
    let component = Component::new()
        .action("echo", echo)
        .action("countdown", countdown);
    actionrt::run(component)
}
