//! # Invocation Outcomes
//!
//! Every decoded request ends in exactly one [`InvocationOutcome`], and
//! [`build_response`] turns it into the response that gets published. The
//! function is pure so each failure path maps to its reply in one place.

use super::engine::{EngineError, ExecutionOutcome};
use crate::messaging::ExecutionResponse;
use serde_json::Value;
use std::time::Duration;

/// Output starting with this line carries a JSON body
pub const JSON_OUTPUT_MARKER: &str = "JSON";

pub const SHUTTING_DOWN_MESSAGE: &str = "Relay is shutting down";

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    UnknownBundle {
        name: String,
        version: Option<String>,
    },
    EngineUnavailable {
        bundle: String,
        error: EngineError,
    },
    EnvironmentUnavailable {
        bundle: String,
        error: EngineError,
    },
    TimedOut {
        bundle: String,
        timeout: Duration,
    },
    Executed {
        bundle: String,
        outcome: ExecutionOutcome,
    },
    /// Dispatch flagged the invocation while shutting down
    ShuttingDown,
}

impl InvocationOutcome {
    /// Short label for log lines
    pub fn label(&self) -> &'static str {
        match self {
            InvocationOutcome::UnknownBundle { .. } => "unknown_bundle",
            InvocationOutcome::EngineUnavailable { .. } => "engine_unavailable",
            InvocationOutcome::EnvironmentUnavailable { .. } => "environment_unavailable",
            InvocationOutcome::TimedOut { .. } => "timed_out",
            InvocationOutcome::Executed { .. } => "executed",
            InvocationOutcome::ShuttingDown => "shutting_down",
        }
    }
}

pub fn build_response(outcome: &InvocationOutcome) -> ExecutionResponse {
    match outcome {
        InvocationOutcome::UnknownBundle { name, version } => {
            let message = match version {
                Some(version) => format!("Unknown command bundle {name} version {version}"),
                None => format!("Unknown command bundle {name}"),
            };
            ExecutionResponse::error(message)
        }
        InvocationOutcome::EngineUnavailable { bundle, error }
        | InvocationOutcome::EnvironmentUnavailable { bundle, error } => {
            ExecutionResponse::error(error.to_string()).with_bundle(bundle)
        }
        InvocationOutcome::TimedOut { bundle, timeout } => ExecutionResponse::error(format!(
            "Command execution timed out after {}ms",
            timeout.as_millis()
        ))
        .with_bundle(bundle),
        InvocationOutcome::Executed { bundle, outcome } => {
            parse_output(outcome).with_bundle(bundle)
        }
        InvocationOutcome::ShuttingDown => ExecutionResponse::error(SHUTTING_DOWN_MESSAGE),
    }
}

/// Execution error wins over the diagnostic stream, which wins over output
fn parse_output(outcome: &ExecutionOutcome) -> ExecutionResponse {
    if let Some(error) = &outcome.error {
        return ExecutionResponse::error(error.to_string());
    }

    let diagnostics = String::from_utf8_lossy(&outcome.errors);
    let diagnostics = diagnostics.trim();
    if !diagnostics.is_empty() {
        return ExecutionResponse::error(diagnostics.to_string());
    }

    let output = String::from_utf8_lossy(&outcome.output);
    if let Some(json) = strip_json_marker(&output) {
        return match serde_json::from_str::<Value>(json) {
            Ok(body) => ExecutionResponse::ok(Some(body), true),
            Err(e) => ExecutionResponse::error(format!("Command returned invalid JSON: {e}")),
        };
    }

    let lines: Vec<Value> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| Value::String(line.to_string()))
        .collect();

    if lines.is_empty() {
        ExecutionResponse::ok(None, false)
    } else {
        ExecutionResponse::ok(Some(Value::Array(lines)), false)
    }
}

fn strip_json_marker(output: &str) -> Option<&str> {
    let (first, rest) = match output.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (output, ""),
    };
    (first.trim_end() == JSON_OUTPUT_MARKER).then_some(rest)
}
