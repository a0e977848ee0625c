use klev_api_models::{
    EgressWebhookCreateParams, EgressWebhookId, EgressWebhookOut, EgressWebhookRotateParams,
    EgressWebhookStatusOut, EgressWebhookUpdateParams, EgressWebhooksOut, LogId,
};

use crate::cli::{
    EgressWebhookCreateArgs, EgressWebhookRotateArgs, EgressWebhookUpdateArgs,
    EgressWebhooksCommand,
};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: EgressWebhooksCommand) -> CliResult<()> {
    match command {
        EgressWebhooksCommand::List(args) => {
            render_json(&list_webhooks(ctx, args.metadata).await?)
        }
        EgressWebhooksCommand::Create(args) => render_json(&create_webhook(ctx, args).await?),
        EgressWebhooksCommand::Get(args) => {
            render_json(&get_webhook(ctx, &args.id.parse()?).await?)
        }
        EgressWebhooksCommand::Update(args) => render_json(&update_webhook(ctx, args).await?),
        EgressWebhooksCommand::Rotate(args) => render_json(&rotate_webhook(ctx, args).await?),
        EgressWebhooksCommand::Status(args) => {
            render_json(&webhook_status(ctx, &args.id.parse()?).await?)
        }
        EgressWebhooksCommand::Delete(args) => {
            render_json(&delete_webhook(ctx, &args.id.parse()?).await?)
        }
    }
}

pub(crate) async fn list_webhooks(
    ctx: &AppContext,
    metadata: Option<String>,
) -> CliResult<EgressWebhooksOut> {
    ctx.list_or_find("egress_webhooks", metadata).await
}

pub(crate) async fn create_webhook(
    ctx: &AppContext,
    args: EgressWebhookCreateArgs,
) -> CliResult<EgressWebhookOut> {
    let params = EgressWebhookCreateParams {
        log_id: LogId::from_raw(args.log_id),
        metadata: args.metadata,
        destination: args.destination,
        payload: args.payload,
    };
    ctx.post(&["egress_webhooks"], &params).await
}

pub(crate) async fn get_webhook(
    ctx: &AppContext,
    id: &EgressWebhookId,
) -> CliResult<EgressWebhookOut> {
    ctx.get(&["egress_webhook", id.as_str()]).await
}

pub(crate) async fn update_webhook(
    ctx: &AppContext,
    args: EgressWebhookUpdateArgs,
) -> CliResult<EgressWebhookOut> {
    let id: EgressWebhookId = args.id.parse()?;
    let params = EgressWebhookUpdateParams {
        metadata: args.metadata,
        destination: args.destination,
    };
    ctx.patch(&["egress_webhook", id.as_str()], &params).await
}

/// Rotate the signing secret; the previous one keeps working for `expire_seconds`.
pub(crate) async fn rotate_webhook(
    ctx: &AppContext,
    args: EgressWebhookRotateArgs,
) -> CliResult<EgressWebhookOut> {
    let id: EgressWebhookId = args.id.parse()?;
    let params = EgressWebhookRotateParams {
        expire_seconds: args.expire_seconds,
    };
    ctx.post(&["egress_webhook", id.as_str(), "rotate"], &params)
        .await
}

pub(crate) async fn webhook_status(
    ctx: &AppContext,
    id: &EgressWebhookId,
) -> CliResult<EgressWebhookStatusOut> {
    ctx.get(&["egress_webhook", id.as_str(), "status"]).await
}

pub(crate) async fn delete_webhook(
    ctx: &AppContext,
    id: &EgressWebhookId,
) -> CliResult<EgressWebhookOut> {
    ctx.delete(&["egress_webhook", id.as_str()]).await
}
