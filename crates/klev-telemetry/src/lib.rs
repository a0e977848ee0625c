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
    missing_docs
)]
//! Telemetry primitives for the klev CLI.
//!
//! Logging goes through `tracing`; this crate owns subscriber installation and
//! the per-invocation root span so the binary stays free of setup details.

pub mod context;
pub mod init;

pub use context::{REQUEST_ID_HEADER, invocation_span, record_outcome};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
