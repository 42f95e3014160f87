use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::{AcquireError, DatasetError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// Maps a handler error onto an outcome. Typed acquisition and dataset
    /// errors keep their reason and hint; anything else is a failure.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(acquire) = err.downcast_ref::<AcquireError>() {
            let message = acquire.to_string();
            let details = acquire.details();
            return match acquire {
                AcquireError::OriginAcquisitionFailed { .. }
                | AcquireError::SourceUnreadable { .. } => Self::failure(message, details),
                _ => Self::user_error(message, details),
            };
        }
        if let Some(dataset) = err.downcast_ref::<DatasetError>() {
            return Self::user_error(
                dataset.to_string(),
                json!({ "reason": "index_out_of_range" }),
            );
        }
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        Self::failure(
            err.to_string(),
            json!({ "reason": "unexpected_error", "chain": chain }),
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

/// Command identity used to prefix status lines, e.g. `jsss dataset build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub group: &'static str,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: &'static str, name: &'static str) -> Self {
        Self { group, name }
    }
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let prefix = format!("jsss {} {}", info.group, info.name);
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}
