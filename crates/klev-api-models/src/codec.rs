//! Conversion between raw message payloads and printable text.
//!
//! `Encoding::String` interprets payload bytes as UTF-8 text and is lossy for
//! binary payloads. `Encoding::Base64` uses the standard padded alphabet and
//! round-trips arbitrary bytes. An absent payload stays absent in both
//! directions; it never collapses into an empty string.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Text representation applied to message keys and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Payload bytes rendered as UTF-8 text.
    #[default]
    String,
    /// Payload bytes rendered as standard padded base64.
    Base64,
}

impl Encoding {
    /// Wire name of the encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Base64 => "base64",
        }
    }

    /// Render a payload as text, preserving absence.
    #[must_use]
    pub fn encode(self, payload: Option<&[u8]>) -> Option<String> {
        let bytes = payload?;
        Some(match self {
            Self::String => String::from_utf8_lossy(bytes).into_owned(),
            Self::Base64 => general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Recover payload bytes from their text form, preserving absence.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidBase64`] when a base64 payload is malformed.
    pub fn decode(self, text: Option<&str>) -> Result<Option<Vec<u8>>, ModelError> {
        let Some(text) = text else {
            return Ok(None);
        };
        match self {
            Self::String => Ok(Some(text.as_bytes().to_vec())),
            Self::Base64 => general_purpose::STANDARD
                .decode(text)
                .map(Some)
                .map_err(|err| ModelError::InvalidBase64 {
                    detail: err.to_string(),
                }),
        }
    }
}

impl FromStr for Encoding {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "base64" => Ok(Self::Base64),
            other => Err(ModelError::InvalidEncoding {
                value: other.to_string(),
            }),
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Decode a standard base64 string, as accepted by the `--*-bytes` flags.
///
/// # Errors
///
/// Returns [`ModelError::InvalidBase64`] when the input is malformed.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, ModelError> {
    general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|err| ModelError::InvalidBase64 {
            detail: err.to_string(),
        })
}

/// Microseconds since the Unix epoch.
#[must_use]
pub fn encode_time(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

/// Inverse of [`encode_time`].
///
/// # Errors
///
/// Returns [`ModelError::InvalidTime`] when the value is outside the range chrono supports.
pub fn decode_time(micros: i64) -> Result<DateTime<Utc>, ModelError> {
    DateTime::from_timestamp_micros(micros).ok_or(ModelError::InvalidTime { micros })
}
