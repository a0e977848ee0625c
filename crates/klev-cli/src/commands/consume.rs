//! `consume`: read batches of messages from a log.
//!
//! Each call starts at the current cursor and prints one JSON document. With
//! `--continue` the cursor becomes the `next_offset` the service returned and
//! the loop issues the next call; it ends only on error or interrupt. Blocking
//! happens inside the remote call (the poll hint), never in a local sleep.

use std::io::{self, Write};

use anyhow::anyhow;
use klev_api_models::{
    ConsumeCursor, ConsumeOptions, ConsumeOut, Encoding, LogId, OFFSET_NEWEST, OFFSET_OLDEST,
    OffsetId, parse_duration,
};

use crate::cli::ConsumeArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::write_json;

pub(crate) async fn run(ctx: &AppContext, args: ConsumeArgs) -> CliResult<()> {
    let (log_id, options) = consume_options(args)?;
    let mut stdout = io::stdout();
    consume(ctx, &log_id, &options, &mut stdout).await
}

/// Turn command-line flags into validated consume options.
pub(crate) fn consume_options(args: ConsumeArgs) -> CliResult<(LogId, ConsumeOptions)> {
    let cursor = match (args.offset, args.offset_id) {
        (Some(_), Some(_)) => {
            return Err(CliError::validation(
                "only one of --offset or --offset-id may be given",
            ));
        }
        (None, Some(offset_id)) => ConsumeCursor::OffsetId(OffsetId::from_raw(offset_id)),
        (Some(offset), None) if offset < OFFSET_OLDEST => {
            return Err(CliError::validation(format!(
                "--offset must be a position, {OFFSET_OLDEST} (oldest) \
                 or {OFFSET_NEWEST} (newest), got {offset}"
            )));
        }
        (Some(offset), None) => ConsumeCursor::Offset(offset),
        (None, None) => ConsumeCursor::default(),
    };
    if args.size <= 0 {
        return Err(CliError::validation("--size must be greater than zero"));
    }
    let poll = args.poll.as_deref().map(parse_duration).transpose()?;
    let encoding: Encoding = args.encoding.parse()?;

    let options = ConsumeOptions {
        cursor,
        max_messages: args.size,
        poll,
        encoding,
        repeat: args.repeat,
    }
    .validate()?;
    Ok((LogId::from_raw(args.log_id), options))
}

/// Run the consume loop, writing one JSON document per batch to `out`.
pub(crate) async fn consume<W: Write + ?Sized>(
    ctx: &AppContext,
    log_id: &LogId,
    options: &ConsumeOptions,
    out: &mut W,
) -> CliResult<()> {
    let mut cursor = options.cursor.clone();
    loop {
        let batch = fetch_batch(ctx, log_id, &cursor, options).await?;
        tracing::debug!(
            log_id = %log_id,
            cursor = ?cursor,
            messages = batch.messages.len(),
            next_offset = batch.next_offset,
            "consumed batch"
        );

        let shown = batch.reencode(options.encoding).map_err(|err| {
            CliError::failure(anyhow!("service returned an undecodable batch: {err}"))
        })?;
        write_json(out, &shown)?;

        if !options.repeat {
            return Ok(());
        }
        cursor = ConsumeCursor::Offset(batch.next_offset);
    }
}

async fn fetch_batch(
    ctx: &AppContext,
    log_id: &LogId,
    cursor: &ConsumeCursor,
    options: &ConsumeOptions,
) -> CliResult<ConsumeOut> {
    let mut query = vec![
        cursor.query_pair(),
        ("len", options.max_messages.to_string()),
        ("encoding", Encoding::Base64.as_str().to_string()),
    ];
    if let Some(poll) = options.poll {
        query.push(("poll", poll.as_millis().to_string()));
    }
    // A long poll must not trip the transport timeout.
    let timeout = options.poll.map(|poll| ctx.timeout + poll);
    ctx.get_with_query(&["messages", log_id.as_str()], &query, timeout)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn args(log_id: &str) -> ConsumeArgs {
        ConsumeArgs {
            log_id: log_id.into(),
            offset: None,
            offset_id: None,
            size: 10,
            poll: None,
            encoding: "string".into(),
            repeat: false,
        }
    }

    fn documents(buffer: &[u8]) -> Vec<Value> {
        serde_json::Deserializer::from_slice(buffer)
            .into_iter::<Value>()
            .collect::<Result<_, _>>()
            .expect("output should be JSON documents")
    }

    fn batch(first: i64, count: i64) -> Value {
        let messages: Vec<Value> = (first..first + count)
            .map(|offset| {
                json!({
                    "offset": offset,
                    "time": 1_700_000_000_000_000_i64 + offset,
                    "key": "a2V5",
                    "value": "dmFsdWU="
                })
            })
            .collect();
        json!({
            "next_offset": first + count,
            "encoding": "base64",
            "messages": messages
        })
    }

    #[test]
    fn repeat_without_poll_is_rejected() {
        let err = consume_options(ConsumeArgs {
            repeat: true,
            ..args("log_1")
        })
        .expect_err("continue needs poll");
        assert!(matches!(err, CliError::Validation(_)));

        let err = consume_options(ConsumeArgs {
            repeat: true,
            poll: Some("0s".into()),
            ..args("log_1")
        })
        .expect_err("zero poll counts as no poll");
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn offsets_below_oldest_are_rejected() {
        let err = consume_options(ConsumeArgs {
            offset: Some(-3),
            ..args("log_1")
        })
        .expect_err("below the oldest sentinel");
        assert!(matches!(err, CliError::Validation(message) if message.contains("-3")));

        let (_, options) = consume_options(ConsumeArgs {
            offset: Some(OFFSET_NEWEST),
            ..args("log_1")
        })
        .expect("newest is a valid start");
        assert_eq!(options.cursor, ConsumeCursor::Offset(-1));
    }

    #[test]
    fn invalid_encoding_and_duration_are_rejected() {
        let err = consume_options(ConsumeArgs {
            encoding: "hex".into(),
            ..args("log_1")
        })
        .expect_err("unknown encoding");
        assert!(matches!(err, CliError::Validation(message) if message.contains("hex")));

        assert!(
            consume_options(ConsumeArgs {
                poll: Some("soon".into()),
                ..args("log_1")
            })
            .is_err()
        );
    }

    #[test]
    fn offset_and_offset_id_are_mutually_exclusive() {
        let err = consume_options(ConsumeArgs {
            offset: Some(0),
            offset_id: Some("off_1".into()),
            ..args("log_1")
        })
        .expect_err("both cursors");
        assert!(matches!(err, CliError::Validation(_)));

        let (_, options) = consume_options(ConsumeArgs {
            offset_id: Some("off_1".into()),
            poll: Some("2s".into()),
            repeat: true,
            ..args("log_1")
        })
        .expect("valid options");
        assert_eq!(
            options.cursor,
            ConsumeCursor::OffsetId(OffsetId::from_raw("off_1"))
        );
        assert_eq!(options.poll, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn single_batch_is_printed_in_requested_encoding() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/messages/log_1")
                .query_param("offset", "0")
                .query_param("len", "2")
                .query_param("encoding", "base64");
            then.status(200).json_body(batch(0, 2));
        });

        let ctx = context_with(&server);
        let (log_id, options) = consume_options(ConsumeArgs {
            offset: Some(0),
            size: 2,
            encoding: "base64".into(),
            ..args("log_1")
        })
        .expect("valid options");
        let mut out = Vec::new();
        consume(&ctx, &log_id, &options, &mut out)
            .await
            .expect("consume should succeed");

        let docs = documents(&out);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["next_offset"], 2);
        assert_eq!(docs[0]["encoding"], "base64");
        assert_eq!(docs[0]["messages"][0]["offset"], 0);
        assert_eq!(docs[0]["messages"][1]["offset"], 1);
        assert_eq!(docs[0]["messages"][1]["value"], "dmFsdWU=");
        mock.assert();
    }

    #[tokio::test]
    async fn string_encoding_decodes_payloads_and_keeps_absent_key() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/messages/log_1").query_param("offset", "-2");
            then.status(200).json_body(json!({
                "next_offset": 1,
                "encoding": "base64",
                "messages": [{"offset": 0, "time": 5, "value": "aGVsbG8="}]
            }));
        });

        let ctx = context_with(&server);
        let (log_id, options) = consume_options(args("log_1")).expect("valid options");
        let mut out = Vec::new();
        consume(&ctx, &log_id, &options, &mut out)
            .await
            .expect("consume should succeed");

        let docs = documents(&out);
        let message = &docs[0]["messages"][0];
        assert_eq!(docs[0]["encoding"], "string");
        assert_eq!(message["value"], "hello");
        assert_eq!(message["time"], 5);
        assert!(message.get("key").is_none());
    }

    #[tokio::test]
    async fn continue_resumes_exactly_at_next_offset() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/messages/log_1")
                .query_param("offset", "0")
                .query_param("poll", "1000");
            then.status(200).json_body(batch(0, 2));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/messages/log_1").query_param("offset", "2");
            then.status(200).json_body(batch(2, 2));
        });
        let third = server.mock(|when, then| {
            when.method(GET).path("/messages/log_1").query_param("offset", "4");
            then.status(200).json_body(batch(4, 2));
        });
        let stop = server.mock(|when, then| {
            when.method(GET).path("/messages/log_1").query_param("offset", "6");
            then.status(410)
                .json_body(json!({"code": "gone", "message": "log deleted"}));
        });

        let ctx = context_with(&server);
        let (log_id, options) = consume_options(ConsumeArgs {
            offset: Some(0),
            size: 2,
            poll: Some("1s".into()),
            repeat: true,
            ..args("log_1")
        })
        .expect("valid options");
        let mut out = Vec::new();
        let err = consume(&ctx, &log_id, &options, &mut out)
            .await
            .expect_err("loop ends on remote error");
        assert!(matches!(err, CliError::Remote { .. }));

        let docs = documents(&out);
        let next_offsets: Vec<i64> = docs
            .iter()
            .map(|doc| doc["next_offset"].as_i64().expect("next offset"))
            .collect();
        assert_eq!(next_offsets, vec![2, 4, 6]);
        let first_offsets: Vec<i64> = docs
            .iter()
            .map(|doc| doc["messages"][0]["offset"].as_i64().expect("offset"))
            .collect();
        assert_eq!(first_offsets, vec![0, 2, 4]);

        first.assert_hits(1);
        second.assert_hits(1);
        third.assert_hits(1);
        stop.assert_hits(1);
    }

    #[tokio::test]
    async fn named_offset_cursor_is_sent_as_offset_id() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/messages/log_1")
                .query_param("offset_id", "off_1");
            then.status(200).json_body(batch(7, 1));
        });

        let ctx = context_with(&server);
        let (log_id, options) = consume_options(ConsumeArgs {
            offset_id: Some("off_1".into()),
            ..args("log_1")
        })
        .expect("valid options");
        let mut out = Vec::new();
        consume(&ctx, &log_id, &options, &mut out)
            .await
            .expect("consume should succeed");
        assert_eq!(documents(&out)[0]["next_offset"], 8);
        mock.assert();
    }
}
