pub mod ask;
pub mod config;
pub mod doctor;
pub mod seed;

use serde::Serialize;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::render(0, CommandOutcome {
            command,
            status: "ok",
            error_class: None,
            correlation_id: None,
            message: message.into(),
        })
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::render(exit_code, CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            correlation_id: None,
            message: message.into(),
        })
    }

    fn render(exit_code: u8, payload: CommandOutcome<'_>) -> Self {
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

/// Result payload that also carries the request's correlation id.
pub(crate) fn traced(
    command: &str,
    correlation_id: &str,
    outcome: Result<String, (&str, String, u8)>,
) -> CommandResult {
    match outcome {
        Ok(message) => CommandResult::render(0, CommandOutcome {
            command,
            status: "ok",
            error_class: None,
            correlation_id: Some(correlation_id),
            message,
        }),
        Err((error_class, message, exit_code)) => CommandResult::render(exit_code, CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            correlation_id: Some(correlation_id),
            message,
        }),
    }
}

pub(crate) fn current_thread_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

fn serialize_payload(payload: &CommandOutcome<'_>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
