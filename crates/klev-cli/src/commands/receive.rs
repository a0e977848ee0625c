//! `receive`: a local listener for egress webhook deliveries.
//!
//! Every delivery must carry `x-klev-signature: t=<unix seconds>,v1=<hex>`,
//! where the signature is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! shared secret. Several `v1` entries may be present while a secret rotation
//! overlaps; any one matching is enough. Accepted deliveries are printed to
//! stdout. Rejected ones are reported on stderr and the listener keeps serving.

use std::future::Future;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use klev_api_models::{ApiError, Message, WebhookDelivery};
use sha2::Sha256;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::cli::ReceiveArgs;
use crate::client::{CliError, CliResult};
use crate::output::write_json;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const SIGNATURE_HEADER: &str = "x-klev-signature";
/// Maximum clock skew accepted between the signature timestamp and local time.
pub(crate) const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub(crate) struct ReceiverState {
    secret: Arc<str>,
    now: fn() -> i64,
}

impl ReceiverState {
    pub(crate) fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
            now: || Utc::now().timestamp(),
        }
    }
}

/// Why a delivery was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    MissingSignature,
    MalformedSignature,
    StaleTimestamp { timestamp: i64, now: i64 },
    SignatureMismatch,
    InvalidBody(String),
}

impl Rejection {
    pub(crate) const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn to_error(&self) -> ApiError {
        let (code, message) = match self {
            Self::MissingSignature => (
                "missing_signature",
                format!("{SIGNATURE_HEADER} header is missing"),
            ),
            Self::MalformedSignature => (
                "malformed_signature",
                format!("{SIGNATURE_HEADER} header must look like t=<seconds>,v1=<hex>"),
            ),
            Self::StaleTimestamp { timestamp, now } => (
                "stale_timestamp",
                format!("signature timestamp {timestamp} is too far from local time {now}"),
            ),
            Self::SignatureMismatch => {
                ("invalid_signature", "signature does not match".to_string())
            }
            Self::InvalidBody(detail) => {
                ("invalid_body", format!("cannot decode delivery: {detail}"))
            }
        };
        ApiError {
            code: code.to_string(),
            message,
            details: None,
        }
    }
}

pub(crate) async fn run(args: ReceiveArgs) -> CliResult<()> {
    let addr = SocketAddr::new(args.bind, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to bind {addr}: {err}")))?;
    let local = listener
        .local_addr()
        .map_err(|err| CliError::failure(anyhow!("failed to read listener address: {err}")))?;

    tracing::info!(addr = %local, "receiving webhook deliveries");
    eprintln!("running server at {local}");
    serve(listener, ReceiverState::new(args.secret), shutdown_signal()).await
}

/// Serve deliveries on `listener` until `shutdown` completes.
pub(crate) async fn serve<F>(
    listener: TcpListener,
    state: ReceiverState,
    shutdown: F,
) -> CliResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| CliError::failure(anyhow!("webhook listener failed: {err}")))
}

fn router(state: ReceiverState) -> Router {
    Router::new()
        .fallback(handle_delivery)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_delivery(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    match accept(&state, &headers, &body) {
        Ok(message) => {
            if let Err(err) = write_message(&mut io::stdout().lock(), &message) {
                tracing::warn!(error = %err, "failed to print delivery");
            }
            StatusCode::OK
        }
        Err(rejection) => {
            tracing::warn!(?rejection, "rejected webhook delivery");
            let error = rejection.to_error();
            if let Err(err) = write_json(&mut io::stderr().lock(), &error) {
                tracing::debug!(error = %err, "failed to report rejected delivery");
            }
            rejection.status()
        }
    }
}

/// Validate the signature and decode the delivery.
pub(crate) fn accept(
    state: &ReceiverState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Message, Rejection> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .ok_or(Rejection::MissingSignature)?
        .to_str()
        .map_err(|_| Rejection::MalformedSignature)?;
    verify_signature(state.secret.as_bytes(), header, body, (state.now)())?;

    serde_json::from_slice::<WebhookDelivery>(body)
        .map_err(|err| Rejection::InvalidBody(err.to_string()))?
        .into_message()
        .map_err(|err| Rejection::InvalidBody(err.to_string()))
}

pub(crate) fn verify_signature(
    secret: &[u8],
    header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), Rejection> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let raw_timestamp = timestamp.ok_or(Rejection::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(Rejection::MalformedSignature);
    }
    let parsed: i64 = raw_timestamp
        .parse()
        .map_err(|_| Rejection::MalformedSignature)?;
    // The timestamp is sender controlled; compare without signed overflow.
    if now.abs_diff(parsed) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(Rejection::StaleTimestamp {
            timestamp: parsed,
            now,
        });
    }

    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        signing_mac(secret, raw_timestamp, body)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    });
    if matched {
        Ok(())
    } else {
        Err(Rejection::SignatureMismatch)
    }
}

fn signing_mac(secret: &[u8], timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

pub(crate) fn write_message<W: Write + ?Sized>(
    writer: &mut W,
    message: &Message,
) -> io::Result<()> {
    let show = |payload: &Option<Vec<u8>>| {
        payload.as_deref().map_or_else(
            || "<none>".to_string(),
            |bytes| String::from_utf8_lossy(bytes).into_owned(),
        )
    };
    writeln!(writer, "Offset: {}", message.offset)?;
    writeln!(
        writer,
        "Time: {}",
        message.time.to_rfc3339_opts(SecondsFormat::Micros, true)
    )?;
    writeln!(writer, "Key: {}", show(&message.key))?;
    writeln!(writer, "Value: {}", show(&message.value))?;
    writer.flush()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("webhook listener shutting down");
}
