use std::time::Duration;

use serde_json::{json, Value};
use tracing::info;

use actionrt::{Component, ReplySink, RequestState};

use crate::cmd::ServeArgs;
use actionrt::exit::{run_error, CliResult, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let component = demo_component();
    info!(
        actions = ?component.actions().names(),
        "starting demo component"
    );
    actionrt::serve(component, &args.input).map_err(|err| run_error("serve failed", err))?;
    Ok(SUCCESS)
}

/// Demo component used by `actionrt serve`.
pub fn demo_component() -> Component {
    Component::new()
        .action("echo", echo)
        .action("sleep", sleep)
        .action("schema", schema)
        .action("vars", vars)
        .action("fail", fail)
}

async fn echo(state: RequestState, sink: ReplySink) {
    sink.reply(&Value::Object(state.command().params.clone()));
}

/// Sleeps for `ms` milliseconds, stopping early once the request is cancelled.
async fn sleep(state: RequestState, sink: ReplySink) {
    let ms = state
        .command()
        .param("ms")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    tokio::select! {
        () = tokio::time::sleep(Duration::from_millis(ms)) => {
            sink.reply(&json!({ "slept_ms": ms }));
        }
        () = state.cancellation().cancelled() => {}
    }
}

async fn schema(state: RequestState, sink: ReplySink) {
    sink.reply(state.schemas().as_ref());
}

async fn vars(state: RequestState, sink: ReplySink) {
    sink.reply(state.variables());
}

async fn fail(state: RequestState, sink: ReplySink) {
    let message = state
        .command()
        .param("message")
        .and_then(Value::as_str)
        .unwrap_or("requested failure")
        .to_string();
    sink.fail(message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_component_registers_all_actions() {
        let component = demo_component();
        assert_eq!(
            component.actions().names(),
            vec!["echo", "fail", "schema", "sleep", "vars"]
        );
    }
}
