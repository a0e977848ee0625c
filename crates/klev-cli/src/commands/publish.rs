//! `publish`: send one message to a log.
//!
//! Each payload field (key, value) may come from exactly one source: an inline
//! string, a file, or base64 encoded bytes. The selection is validated for both
//! fields before anything is read or sent.

use std::path::PathBuf;

use anyhow::anyhow;
use klev_api_models::{LogId, PostIn, PostOut, decode_base64, decode_time};

use crate::cli::PublishArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_json;

/// The single source a payload field was given from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PayloadSource {
    Inline(String),
    File(PathBuf),
    Base64(String),
}

impl PayloadSource {
    fn load(self) -> CliResult<Vec<u8>> {
        match self {
            Self::Inline(text) => Ok(text.into_bytes()),
            Self::File(path) => std::fs::read(&path).map_err(|err| {
                CliError::failure(anyhow!("failed to read '{}': {err}", path.display()))
            }),
            Self::Base64(text) => Ok(decode_base64(&text)?),
        }
    }
}

/// Pick the one source supplied for a payload field, if any.
pub(crate) fn select_payload(
    field: &str,
    inline: Option<String>,
    file: Option<PathBuf>,
    bytes: Option<String>,
) -> CliResult<Option<PayloadSource>> {
    let mut sources = [
        inline.map(PayloadSource::Inline),
        file.map(PayloadSource::File),
        bytes.map(PayloadSource::Base64),
    ]
    .into_iter()
    .flatten();

    let selected = sources.next();
    if sources.next().is_some() {
        return Err(CliError::validation(format!(
            "only one of --{field}, --{field}-file or --{field}-bytes may be given"
        )));
    }
    Ok(selected)
}

pub(crate) async fn run(ctx: &AppContext, args: PublishArgs) -> CliResult<()> {
    render_json(&publish(ctx, args).await?)
}

pub(crate) async fn publish(ctx: &AppContext, args: PublishArgs) -> CliResult<PostOut> {
    let key = select_payload("key", args.key, args.key_file, args.key_bytes)?;
    let value = select_payload("value", args.value, args.value_file, args.value_bytes)?;
    let time = args.time.map(decode_time).transpose()?;

    let key = key.map(PayloadSource::load).transpose()?;
    let value = value.map(PayloadSource::load).transpose()?;

    let log_id = LogId::from_raw(args.log_id);
    let body = PostIn::new(time, key.as_deref(), value.as_deref());
    let out: PostOut = ctx.post(&["message", log_id.as_str()], &body).await?;
    tracing::debug!(log_id = %log_id, next_offset = out.next_offset, "message published");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn select_payload_rejects_multiple_sources() {
        let err = select_payload("key", Some("a".into()), Some(PathBuf::from("k.bin")), None)
            .expect_err("two sources");
        assert!(matches!(err, CliError::Validation(message) if message.contains("--key-file")));
        assert_eq!(
            select_payload("value", None, None, Some("aGk=".into())).expect("one source"),
            Some(PayloadSource::Base64("aGk=".into()))
        );
        assert_eq!(select_payload("value", None, None, None).expect("none"), None);
    }

    #[tokio::test]
    async fn publish_without_time_sends_zero_and_returns_offset() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/message/log_1").json_body(json!({
                "time": 0,
                "encoding": "base64",
                "value": "aGVsbG8="
            }));
            then.status(200).json_body(json!({"next_offset": 17}));
        });

        let ctx = context_with(&server);
        let args = PublishArgs {
            log_id: "log_1".into(),
            value: Some("hello".into()),
            ..PublishArgs::default()
        };
        let out = publish(&ctx, args).await.expect("publish should succeed");
        assert_eq!(out.next_offset, 17);
        mock.assert();
    }

    #[tokio::test]
    async fn publish_reads_key_file_and_decodes_value_bytes() {
        let mut key_file = tempfile::NamedTempFile::new().expect("temp file");
        key_file.write_all(&[0x00, 0xff]).expect("write key");

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/message/log_1").json_body(json!({
                "time": 1_700_000_000_000_000_i64,
                "encoding": "base64",
                "key": "AP8=",
                "value": "aGk="
            }));
            then.status(200).json_body(json!({"next_offset": 3}));
        });

        let ctx = context_with(&server);
        let args = PublishArgs {
            log_id: "log_1".into(),
            time: Some(1_700_000_000_000_000),
            key_file: Some(key_file.path().to_path_buf()),
            value_bytes: Some("aGk=".into()),
            ..PublishArgs::default()
        };
        publish(&ctx, args).await.expect("publish should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn conflicting_sources_make_no_remote_call() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({"next_offset": 0}));
        });

        let ctx = context_with(&server);
        let args = PublishArgs {
            log_id: "log_1".into(),
            key: Some("k".into()),
            key_file: Some(PathBuf::from("/nonexistent/key")),
            ..PublishArgs::default()
        };
        let err = publish(&ctx, args).await.expect_err("should be rejected");
        assert!(matches!(err, CliError::Validation(_)));
        assert_eq!(err.exit_code(), 2);
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn malformed_base64_is_a_validation_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({"next_offset": 0}));
        });

        let ctx = context_with(&server);
        let args = PublishArgs {
            log_id: "log_1".into(),
            value_bytes: Some("%%%".into()),
            ..PublishArgs::default()
        };
        let err = publish(&ctx, args).await.expect_err("should be rejected");
        assert!(matches!(err, CliError::Validation(_)));
        mock.assert_hits(0);
    }
}
