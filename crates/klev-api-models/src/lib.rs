#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
//! Shared HTTP DTOs for the klev API.
//!
//! The CLI encodes every request and decodes every response through these
//! types so that the wire contract lives in one place: typed identifiers, the
//! message codec, the consume cursor, per-resource parameters with
//! present/absent update fields, and the structured error document.

pub mod codec;
pub mod error;
pub mod ids;
pub mod messages;
pub mod resources;

pub use codec::{Encoding, decode_base64, decode_time, encode_time};
pub use error::{ApiError, ModelError};
pub use ids::{EgressWebhookId, FilterId, IngressWebhookId, LogId, OffsetId, TokenId};
pub use messages::{
    ConsumeCursor, ConsumeOptions, ConsumeOut, DEFAULT_CONSUME_LEN, EncodedMessage, Message,
    OFFSET_NEWEST, OFFSET_OLDEST, PostIn, PostOut, WebhookDelivery, parse_duration,
};
pub use resources::*;
