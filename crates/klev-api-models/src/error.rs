//! Error types shared by the klev DTOs.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failures raised while parsing or converting DTO values locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Identifier did not match the expected resource format.
    #[error("invalid {kind} id '{value}': expected '{prefix}' followed by alphanumerics")]
    InvalidId {
        /// Resource kind the identifier was parsed for.
        kind: &'static str,
        /// Required identifier prefix.
        prefix: &'static str,
        /// Offending input.
        value: String,
    },
    /// Payload encoding name was not recognised.
    #[error("invalid encoding: {value}")]
    InvalidEncoding {
        /// Encoding name supplied by the caller.
        value: String,
    },
    /// Base64 payload could not be decoded.
    #[error("invalid base64 payload: {detail}")]
    InvalidBase64 {
        /// Decoder error detail.
        detail: String,
    },
    /// ACL entry was not a JSON object.
    #[error("invalid acl item '{value}': {detail}")]
    InvalidAclItem {
        /// Raw entry supplied by the caller.
        value: String,
        /// Parser error detail.
        detail: String,
    },
    /// Timestamp could not be represented.
    #[error("timestamp out of range: {micros}us")]
    InvalidTime {
        /// Microseconds since the Unix epoch.
        micros: i64,
    },
    /// Egress payload kind was not recognised.
    #[error("invalid egress payload '{value}': expected message or offset")]
    InvalidEgressPayload {
        /// Payload kind supplied by the caller.
        value: String,
    },
    /// Duration text did not match `<n>ms`, `<n>s`, `<n>m` or `<n>h`.
    #[error("invalid duration '{value}': expected a number followed by ms, s, m or h")]
    InvalidDuration {
        /// Duration text supplied by the caller.
        value: String,
    },
    /// Continuous consumption was requested without a poll duration.
    #[error("continue requires polling: pass --poll with a non-zero duration")]
    RepeatWithoutPoll,
}

/// Structured error document returned by the klev API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable summary.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Additional context, such as the fields that failed validation.
    pub details: Option<Value>,
}

impl Display for ApiError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_error_parses_without_details() {
        let parsed: ApiError =
            serde_json::from_value(json!({"code": "not_found", "message": "log not found"}))
                .expect("valid error payload");
        assert_eq!(parsed.code, "not_found");
        assert!(parsed.details.is_none());
        assert_eq!(parsed.to_string(), "not_found: log not found");
    }

    #[test]
    fn api_error_round_trips_details() {
        let error = ApiError {
            code: "validation".into(),
            message: "bad input".into(),
            details: Some(json!({"field": "trim_seconds"})),
        };
        let value = serde_json::to_value(&error).expect("serialize");
        assert_eq!(value["details"]["field"], "trim_seconds");
    }
}
