//! Invocation spans tying every log line of one command run together.
//!
//! # Design
//! - One root span per process invocation, carrying the command name and trace id.
//! - The same trace id travels to the service as `x-request-id`, so client and server logs join up.

use tracing::Span;

/// Header carrying the invocation trace id on outbound requests.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the root span for one command invocation.
///
/// The `outcome` field starts empty and is filled by [`record_outcome`].
#[must_use]
pub fn invocation_span(command: &str, trace_id: &str) -> Span {
    tracing::info_span!(
        "klev",
        command = %command,
        trace_id = %trace_id,
        outcome = tracing::field::Empty
    )
}

/// Record how the invocation ended on its root span.
pub fn record_outcome(span: &Span, exit_code: i32) {
    span.record("outcome", exit_code);
}
