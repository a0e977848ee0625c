use klev_api_models::{LogCreateParams, LogId, LogOut, LogStatsOut, LogUpdateParams, LogsOut};

use crate::cli::{LogCreateArgs, LogUpdateArgs, LogsCommand};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: LogsCommand) -> CliResult<()> {
    match command {
        LogsCommand::List(args) => render_json(&list_logs(ctx, args.metadata).await?),
        LogsCommand::Create(args) => render_json(&create_log(ctx, args).await?),
        LogsCommand::Get(args) => render_json(&get_log(ctx, &LogId::from_raw(args.id)).await?),
        LogsCommand::Update(args) => render_json(&update_log(ctx, args).await?),
        LogsCommand::Stats(args) => {
            render_json(&log_stats(ctx, &LogId::from_raw(args.id)).await?)
        }
        LogsCommand::Delete(args) => {
            render_json(&delete_log(ctx, &LogId::from_raw(args.id)).await?)
        }
    }
}

pub(crate) async fn list_logs(ctx: &AppContext, metadata: Option<String>) -> CliResult<LogsOut> {
    ctx.list_or_find("logs", metadata).await
}

pub(crate) async fn create_log(ctx: &AppContext, args: LogCreateArgs) -> CliResult<LogOut> {
    let params = LogCreateParams {
        metadata: args.metadata,
        compacting: args.compacting,
        cleanup: args.cleanup.into(),
    };
    ctx.post(&["logs"], &params).await
}

pub(crate) async fn get_log(ctx: &AppContext, id: &LogId) -> CliResult<LogOut> {
    ctx.get(&["log", id.as_str()]).await
}

pub(crate) fn update_params(args: &LogUpdateArgs) -> LogUpdateParams {
    LogUpdateParams {
        metadata: args.metadata.clone(),
        cleanup: args.cleanup.clone().into(),
    }
}

pub(crate) async fn update_log(ctx: &AppContext, args: LogUpdateArgs) -> CliResult<LogOut> {
    let params = update_params(&args);
    let id = LogId::from_raw(args.id);
    ctx.patch(&["log", id.as_str()], &params).await
}

pub(crate) async fn log_stats(ctx: &AppContext, id: &LogId) -> CliResult<LogStatsOut> {
    ctx.get(&["log", id.as_str(), "stats"]).await
}

pub(crate) async fn delete_log(ctx: &AppContext, id: &LogId) -> CliResult<LogOut> {
    ctx.delete(&["log", id.as_str()]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CleanupArgs;
    use crate::client::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;

    fn log_json(id: &str) -> serde_json::Value {
        json!({
            "log_id": id,
            "metadata": "orders",
            "compacting": false,
            "trim_seconds": 3600
        })
    }

    #[test]
    fn update_with_only_metadata_sends_only_metadata() {
        let args = LogUpdateArgs {
            id: "log_1".into(),
            metadata: Some("renamed".into()),
            cleanup: CleanupArgs::default(),
        };
        assert_eq!(
            serde_json::to_value(update_params(&args)).expect("serialize"),
            json!({"metadata": "renamed"})
        );
    }

    #[tokio::test]
    async fn list_without_metadata_lists_all_logs() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/logs");
            then.status(200)
                .json_body(json!({"logs": [log_json("log_1"), log_json("log_2")]}));
        });

        let ctx = context_with(&server);
        let logs = list_logs(&ctx, None).await.expect("list should succeed");
        assert_eq!(logs.logs.len(), 2);
        assert_eq!(logs.logs[0].cleanup.trim_seconds, Some(3600));
        mock.assert();
    }

    #[tokio::test]
    async fn list_with_metadata_finds_logs() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/logs").query_param("metadata", "orders");
            then.status(200).json_body(json!({"logs": [log_json("log_1")]}));
        });

        let ctx = context_with(&server);
        let logs = list_logs(&ctx, Some("orders".into()))
            .await
            .expect("find should succeed");
        assert_eq!(logs.logs[0].log_id.as_str(), "log_1");
        mock.assert();
    }

    #[tokio::test]
    async fn create_sends_cleanup_policy() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/logs").json_body(json!({
                "metadata": "orders",
                "compacting": true,
                "trim_bytes": 1_048_576,
                "expire_seconds": 86_400
            }));
            then.status(200).json_body(log_json("log_new"));
        });

        let ctx = context_with(&server);
        let args = LogCreateArgs {
            metadata: "orders".into(),
            compacting: true,
            cleanup: CleanupArgs {
                trim_bytes: Some(1_048_576),
                expire_seconds: Some(86_400),
                ..CleanupArgs::default()
            },
        };
        let log = create_log(&ctx, args).await.expect("create should succeed");
        assert_eq!(log.log_id.as_str(), "log_new");
        mock.assert();
    }

    #[tokio::test]
    async fn update_patches_only_supplied_fields() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/log/log_1")
                .json_body(json!({"trim_count": 0}));
            then.status(200).json_body(log_json("log_1"));
        });

        let ctx = context_with(&server);
        let args = LogUpdateArgs {
            id: "log_1".into(),
            metadata: None,
            cleanup: CleanupArgs {
                trim_count: Some(0),
                ..CleanupArgs::default()
            },
        };
        update_log(&ctx, args).await.expect("update should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn stats_and_delete_hit_log_paths() {
        let server = MockServer::start_async().await;
        let stats = server.mock(|when, then| {
            when.method(GET).path("/log/log_1/stats");
            then.status(200).json_body(json!({"size": 2048, "count": 12}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/log/log_1");
            then.status(200).json_body(log_json("log_1"));
        });

        let ctx = context_with(&server);
        let id = LogId::from_raw("log_1");
        let out = log_stats(&ctx, &id).await.expect("stats should succeed");
        assert_eq!(out["count"], 12);
        let deleted = delete_log(&ctx, &id).await.expect("delete should succeed");
        assert_eq!(deleted.log_id, id);
        stats.assert();
        delete.assert();
    }
}
