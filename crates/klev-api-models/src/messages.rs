//! Message publish/consume payloads and the consume cursor.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{Encoding, decode_time, encode_time};
use crate::error::ModelError;
use crate::ids::OffsetId;

/// Consume from the oldest retained message.
pub const OFFSET_OLDEST: i64 = -2;
/// Consume only messages published after the call starts.
pub const OFFSET_NEWEST: i64 = -1;
/// Batch size used when the caller does not choose one.
pub const DEFAULT_CONSUME_LEN: i32 = 10;

/// A message held by a log, with raw payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position assigned by the service.
    pub offset: i64,
    /// Publish time at microsecond resolution.
    pub time: DateTime<Utc>,
    /// Optional key bytes.
    pub key: Option<Vec<u8>>,
    /// Optional value bytes.
    pub value: Option<Vec<u8>>,
}

/// A message with payloads rendered in some [`Encoding`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodedMessage {
    /// Position assigned by the service.
    pub offset: i64,
    /// Publish time in microseconds since the Unix epoch.
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded key, absent when the message has none.
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded value, absent when the message has none.
    pub value: Option<String>,
}

impl EncodedMessage {
    /// Render a message with the given encoding.
    #[must_use]
    pub fn encode(message: &Message, encoding: Encoding) -> Self {
        Self {
            offset: message.offset,
            time: encode_time(message.time),
            key: encoding.encode(message.key.as_deref()),
            value: encoding.encode(message.value.as_deref()),
        }
    }

    /// Recover the raw message from its encoded form.
    ///
    /// # Errors
    ///
    /// Fails when a payload does not decode under `encoding` or the time is out of range.
    pub fn decode(&self, encoding: Encoding) -> Result<Message, ModelError> {
        Ok(Message {
            offset: self.offset,
            time: decode_time(self.time)?,
            key: encoding.decode(self.key.as_deref())?,
            value: encoding.decode(self.value.as_deref())?,
        })
    }
}

/// Body of `POST /message/{log_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostIn {
    /// Publish time in microseconds; zero lets the service assign the current time.
    pub time: i64,
    /// Encoding applied to `key` and `value`.
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded key.
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded value.
    pub value: Option<String>,
}

impl PostIn {
    /// Build a publish request; payloads always travel base64-encoded.
    #[must_use]
    pub fn new(time: Option<DateTime<Utc>>, key: Option<&[u8]>, value: Option<&[u8]>) -> Self {
        let encoding = Encoding::Base64;
        Self {
            time: time.map_or(0, encode_time),
            encoding,
            key: encoding.encode(key),
            value: encoding.encode(value),
        }
    }
}

/// Result of publishing a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostOut {
    /// Offset assigned to the published message.
    pub next_offset: i64,
}

/// A batch returned by the consume endpoint, also used as the CLI's output document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumeOut {
    /// Offset to resume from on the next call.
    pub next_offset: i64,
    /// Encoding applied to the payloads in `messages`.
    pub encoding: Encoding,
    #[serde(default)]
    /// Messages in offset order.
    pub messages: Vec<EncodedMessage>,
}

impl ConsumeOut {
    /// Decode the batch into raw messages.
    ///
    /// # Errors
    ///
    /// Fails when any payload does not decode under the batch encoding.
    pub fn decode_messages(&self) -> Result<Vec<Message>, ModelError> {
        self.messages
            .iter()
            .map(|message| message.decode(self.encoding))
            .collect()
    }

    /// Re-render the batch under another encoding.
    ///
    /// # Errors
    ///
    /// Fails when any payload does not decode under the batch encoding.
    pub fn reencode(&self, target: Encoding) -> Result<Self, ModelError> {
        let messages = self
            .decode_messages()?
            .iter()
            .map(|message| EncodedMessage::encode(message, target))
            .collect();
        Ok(Self {
            next_offset: self.next_offset,
            encoding: target,
            messages,
        })
    }
}

/// Where a consume call starts reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeCursor {
    /// Explicit log position (or one of the `OFFSET_*` sentinels).
    Offset(i64),
    /// Position stored in a named offset resource, resolved by the service.
    OffsetId(OffsetId),
}

impl Default for ConsumeCursor {
    fn default() -> Self {
        Self::Offset(OFFSET_OLDEST)
    }
}

impl ConsumeCursor {
    /// Query parameter carrying this cursor.
    #[must_use]
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            Self::Offset(offset) => ("offset", offset.to_string()),
            Self::OffsetId(id) => ("offset_id", id.to_string()),
        }
    }
}

/// Parameters of a consume session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Starting cursor.
    pub cursor: ConsumeCursor,
    /// Maximum messages per batch.
    pub max_messages: i32,
    /// How long the service may hold a call open waiting for new messages.
    pub poll: Option<Duration>,
    /// Encoding used to display payloads.
    pub encoding: Encoding,
    /// Keep consuming from each returned `next_offset` until interrupted.
    pub repeat: bool,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            cursor: ConsumeCursor::default(),
            max_messages: DEFAULT_CONSUME_LEN,
            poll: None,
            encoding: Encoding::default(),
            repeat: false,
        }
    }
}

impl ConsumeOptions {
    /// Check the option invariants; a zero poll counts as no poll.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RepeatWithoutPoll`] when `repeat` is set without a poll duration.
    pub fn validate(self) -> Result<Self, ModelError> {
        let poll = self.poll.filter(|poll| !poll.is_zero());
        if self.repeat && poll.is_none() {
            return Err(ModelError::RepeatWithoutPoll);
        }
        Ok(Self { poll, ..self })
    }
}

/// Parse a poll duration such as `500ms`, `30s`, `5m` or `1h`.
///
/// # Errors
///
/// Returns [`ModelError::InvalidDuration`] for anything else.
pub fn parse_duration(text: &str) -> Result<Duration, ModelError> {
    let invalid = || ModelError::InvalidDuration {
        value: text.to_string(),
    };
    let trimmed = text.trim();
    let split = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = trimmed.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| invalid())?;
    let millis = match unit {
        "ms" => Some(amount),
        "s" => amount.checked_mul(1_000),
        "m" => amount.checked_mul(60_000),
        "h" => amount.checked_mul(3_600_000),
        _ => None,
    }
    .ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

/// Delivery body sent by the service to a webhook receiver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookDelivery {
    /// Offset of the delivered message.
    pub offset: i64,
    /// Publish time in microseconds since the Unix epoch.
    pub time: i64,
    #[serde(default)]
    /// Encoding applied to `key` and `value`.
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded key.
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Encoded value.
    pub value: Option<String>,
}

impl WebhookDelivery {
    /// Decode the delivery into a raw message.
    ///
    /// # Errors
    ///
    /// Fails when a payload does not decode or the time is out of range.
    pub fn into_message(self) -> Result<Message, ModelError> {
        let encoding = self.encoding;
        EncodedMessage {
            offset: self.offset,
            time: self.time,
            key: self.key,
            value: self.value,
        }
        .decode(encoding)
    }
}
