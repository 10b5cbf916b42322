//! Execution request wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed execution request: {message}")]
    Malformed { message: String },

    #[error("Execution request missing required field: {field}")]
    MissingField { field: String },
}

impl DecodeError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Request to run a command from a bundle, decoded from a bus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default)]
    pub bundle_name: String,
    /// Exact version to run; latest when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub pipeline_id: String,
    #[serde(default)]
    pub reply_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cog_env: Option<Value>,
    /// Command-specific fields the relay does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionRequest {
    /// Decode and normalize a payload.
    ///
    /// Anything that fails here is dropped by the worker without a reply.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut request: Self = serde_json::from_slice(payload)
            .map_err(|e| DecodeError::malformed(e.to_string()))?;
        request.parse();
        request.validate()?;
        Ok(request)
    }

    /// Normalize fields in place.
    ///
    /// `command` of the form `bundle:command` supplies the bundle name when
    /// `bundle_name` is empty.
    pub fn parse(&mut self) {
        self.bundle_name = self.bundle_name.trim().to_string();
        self.version = self
            .version
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if self.bundle_name.is_empty() {
            if let Some((bundle, command)) = self
                .command
                .as_deref()
                .and_then(|cmd| cmd.split_once(':'))
                .map(|(b, c)| (b.trim().to_string(), c.trim().to_string()))
            {
                self.bundle_name = bundle;
                self.command = Some(command);
            }
        }
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.bundle_name.is_empty() {
            return Err(DecodeError::missing_field("bundle_name"));
        }
        if self.reply_to.trim().is_empty() {
            return Err(DecodeError::missing_field("reply_to"));
        }
        Ok(())
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }
}
