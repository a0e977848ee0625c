//! Resource documents and the create/update/action parameter payloads.
//!
//! Update payloads carry every field as `Option<T>` and skip `None` when
//! serialising: a field the caller never mentioned is absent from the body,
//! while `Some("")` or `Some(0)` explicitly clears it on the server.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::ids::{EgressWebhookId, FilterId, IngressWebhookId, LogId, OffsetId, TokenId};

/// Index of API paths returned by `GET /paths`.
pub type PathsOut = Map<String, Value>;
/// Log statistics as reported by the service.
pub type LogStatsOut = Map<String, Value>;
/// Delivery health of an egress webhook as reported by the service.
pub type EgressWebhookStatusOut = Map<String, Value>;
/// Evaluation health of a filter as reported by the service.
pub type FilterStatusOut = Map<String, Value>;

// Logs

/// Retention settings of a log.
///
/// On create an absent field means "no limit"; on update it means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Trim the oldest messages once the log exceeds this many bytes.
    pub trim_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Trim the oldest messages once the log holds more than this many.
    pub trim_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Trim messages older than this many seconds.
    pub trim_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Compact messages older than this many seconds.
    pub compact_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Drop the latest message of a key after this many seconds.
    pub expire_seconds: Option<i64>,
}

/// A log as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogOut {
    /// Log identifier.
    pub log_id: LogId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    #[serde(default)]
    /// Whether the log keeps only the latest message per key.
    pub compacting: bool,
    #[serde(flatten)]
    /// Retention settings; absent fields are unlimited.
    pub cleanup: CleanupPolicy,
}

/// Response of the log list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogsOut {
    #[serde(default)]
    /// Matching logs.
    pub logs: Vec<LogOut>,
}

/// Body of `POST /logs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogCreateParams {
    /// Caller supplied metadata.
    pub metadata: String,
    /// Keep only the latest message per key.
    pub compacting: bool,
    #[serde(flatten)]
    /// Retention settings.
    pub cleanup: CleanupPolicy,
}

/// Body of `PATCH /log/{log_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
    #[serde(flatten)]
    /// Retention fields to change.
    pub cleanup: CleanupPolicy,
}

// Offsets

/// A named offset as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetOut {
    /// Offset identifier.
    pub offset_id: OffsetId,
    /// Log the offset tracks.
    pub log_id: LogId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    #[serde(default)]
    /// Stored position.
    pub value: i64,
    #[serde(default)]
    /// Metadata stored alongside the position.
    pub value_metadata: String,
}

/// Response of the offset list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetsOut {
    #[serde(default)]
    /// Matching offsets.
    pub offsets: Vec<OffsetOut>,
}

/// Body of `POST /offsets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetCreateParams {
    /// Log the offset tracks.
    pub log_id: LogId,
    /// Caller supplied metadata.
    pub metadata: String,
}

/// Body of `PATCH /offset/{offset_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement position.
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement position metadata.
    pub value_metadata: Option<String>,
}

/// Body of `POST /offset/{offset_id}`; overwrites the stored position.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetSetParams {
    /// New position.
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Metadata stored alongside the position.
    pub value_metadata: Option<String>,
}

/// Body of `POST /offset/{offset_id}/ack`; the service only moves the position forward.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffsetAckParams {
    /// Position that has been processed.
    pub value: i64,
}

// Tokens

/// Permission entry attached to a token, kept as the JSON object the caller wrote.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AclItem(pub Map<String, Value>);

impl FromStr for AclItem {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: String| ModelError::InvalidAclItem {
            value: value.to_string(),
            detail,
        };
        match serde_json::from_str::<Value>(value).map_err(|err| invalid(err.to_string()))? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(invalid("expected a JSON object".to_string())),
        }
    }
}

/// An access token as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenOut {
    /// Token identifier.
    pub token_id: TokenId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    #[serde(default)]
    /// Permissions granted to the token.
    pub acl: Vec<AclItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Bearer secret, only present in the create response.
    pub bearer: Option<String>,
}

/// Response of the token list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokensOut {
    #[serde(default)]
    /// Matching tokens.
    pub tokens: Vec<TokenOut>,
}

/// Body of `POST /tokens`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCreateParams {
    /// Caller supplied metadata.
    pub metadata: String,
    /// Permissions granted to the token, in the order given.
    pub acl: Vec<AclItem>,
}

/// Body of `PATCH /token/{token_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement permission list; `Some(vec![])` revokes every entry.
    pub acl: Option<Vec<AclItem>>,
}

// Ingress webhooks

/// An ingress webhook as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressWebhookOut {
    /// Webhook identifier.
    pub webhook_id: IngressWebhookId,
    /// Log receiving the deliveries.
    pub log_id: LogId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    #[serde(rename = "type")]
    /// Sender integration the webhook understands.
    pub kind: String,
}

/// Response of the ingress webhook list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressWebhooksOut {
    #[serde(default)]
    /// Matching webhooks.
    pub webhooks: Vec<IngressWebhookOut>,
}

/// Body of `POST /ingress_webhooks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressWebhookCreateParams {
    /// Log receiving the deliveries.
    pub log_id: LogId,
    /// Caller supplied metadata.
    pub metadata: String,
    #[serde(rename = "type")]
    /// Sender integration the webhook understands.
    pub kind: String,
    /// Secret used to validate deliveries.
    pub secret: String,
}

/// Body of `PATCH /ingress_webhook/{webhook_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressWebhookUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
}

/// Body of `POST /ingress_webhook/{webhook_id}/rotate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressWebhookRotateParams {
    /// New validation secret.
    pub secret: String,
}

// Egress webhooks

/// What an egress webhook delivers for each message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EgressPayload {
    /// The full message.
    #[default]
    Message,
    /// Only the message offset.
    Offset,
}

impl FromStr for EgressPayload {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "message" => Ok(Self::Message),
            "offset" => Ok(Self::Offset),
            other => Err(ModelError::InvalidEgressPayload {
                value: other.to_string(),
            }),
        }
    }
}

impl Display for EgressPayload {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Message => "message",
            Self::Offset => "offset",
        })
    }
}

/// An egress webhook as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressWebhookOut {
    /// Webhook identifier.
    pub webhook_id: EgressWebhookId,
    /// Log whose messages are delivered.
    pub log_id: LogId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    /// Destination URL.
    pub destination: String,
    #[serde(default)]
    /// Delivered payload kind.
    pub payload: EgressPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Signing secret, present in create and rotate responses.
    pub secret: Option<String>,
}

/// Response of the egress webhook list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressWebhooksOut {
    #[serde(default)]
    /// Matching webhooks.
    pub webhooks: Vec<EgressWebhookOut>,
}

/// Body of `POST /egress_webhooks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressWebhookCreateParams {
    /// Log whose messages are delivered.
    pub log_id: LogId,
    /// Caller supplied metadata.
    pub metadata: String,
    /// Destination URL.
    pub destination: String,
    /// Delivered payload kind.
    pub payload: EgressPayload,
}

/// Body of `PATCH /egress_webhook/{webhook_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressWebhookUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement destination URL.
    pub destination: Option<String>,
}

/// Body of `POST /egress_webhook/{webhook_id}/rotate`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressWebhookRotateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// How long the previous secret keeps signing deliveries.
    pub expire_seconds: Option<i64>,
}

// Filters

/// A filter as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOut {
    /// Filter identifier.
    pub filter_id: FilterId,
    /// Log the filter reads.
    pub source_id: LogId,
    /// Log the filter writes.
    pub target_id: LogId,
    #[serde(default)]
    /// Caller supplied metadata.
    pub metadata: String,
    /// Expression evaluated for each message.
    pub expression: String,
}

/// Response of the filter list and find calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FiltersOut {
    #[serde(default)]
    /// Matching filters.
    pub filters: Vec<FilterOut>,
}

/// Body of `POST /filters`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterCreateParams {
    /// Log the filter reads.
    pub source_id: LogId,
    /// Log the filter writes.
    pub target_id: LogId,
    /// Caller supplied metadata.
    pub metadata: String,
    /// Expression evaluated for each message.
    pub expression: String,
}

/// Body of `PATCH /filter/{filter_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement metadata.
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement expression.
    pub expression: Option<String>,
}
