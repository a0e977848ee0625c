use klev_api_models::{
    IngressWebhookCreateParams, IngressWebhookId, IngressWebhookOut, IngressWebhookRotateParams,
    IngressWebhookUpdateParams, IngressWebhooksOut, LogId,
};

use crate::cli::{
    IngressWebhookCreateArgs, IngressWebhookRotateArgs, IngressWebhookUpdateArgs,
    IngressWebhooksCommand,
};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: IngressWebhooksCommand) -> CliResult<()> {
    match command {
        IngressWebhooksCommand::List(args) => {
            render_json(&list_webhooks(ctx, args.metadata).await?)
        }
        IngressWebhooksCommand::Create(args) => render_json(&create_webhook(ctx, args).await?),
        IngressWebhooksCommand::Get(args) => {
            render_json(&get_webhook(ctx, &IngressWebhookId::from_raw(args.id)).await?)
        }
        IngressWebhooksCommand::Update(args) => render_json(&update_webhook(ctx, args).await?),
        IngressWebhooksCommand::Rotate(args) => render_json(&rotate_webhook(ctx, args).await?),
        IngressWebhooksCommand::Delete(args) => {
            render_json(&delete_webhook(ctx, &IngressWebhookId::from_raw(args.id)).await?)
        }
    }
}

pub(crate) async fn list_webhooks(
    ctx: &AppContext,
    metadata: Option<String>,
) -> CliResult<IngressWebhooksOut> {
    ctx.list_or_find("ingress_webhooks", metadata).await
}

pub(crate) async fn create_webhook(
    ctx: &AppContext,
    args: IngressWebhookCreateArgs,
) -> CliResult<IngressWebhookOut> {
    let params = IngressWebhookCreateParams {
        log_id: LogId::from_raw(args.log_id),
        metadata: args.metadata,
        kind: args.kind,
        secret: args.secret,
    };
    ctx.post(&["ingress_webhooks"], &params).await
}

pub(crate) async fn get_webhook(
    ctx: &AppContext,
    id: &IngressWebhookId,
) -> CliResult<IngressWebhookOut> {
    ctx.get(&["ingress_webhook", id.as_str()]).await
}

pub(crate) async fn update_webhook(
    ctx: &AppContext,
    args: IngressWebhookUpdateArgs,
) -> CliResult<IngressWebhookOut> {
    let id = IngressWebhookId::from_raw(args.id);
    let params = IngressWebhookUpdateParams {
        metadata: args.metadata,
    };
    ctx.patch(&["ingress_webhook", id.as_str()], &params).await
}

pub(crate) async fn rotate_webhook(
    ctx: &AppContext,
    args: IngressWebhookRotateArgs,
) -> CliResult<IngressWebhookOut> {
    let id = IngressWebhookId::from_raw(args.id);
    let params = IngressWebhookRotateParams {
        secret: args.secret,
    };
    ctx.post(&["ingress_webhook", id.as_str(), "rotate"], &params)
        .await
}

pub(crate) async fn delete_webhook(
    ctx: &AppContext,
    id: &IngressWebhookId,
) -> CliResult<IngressWebhookOut> {
    ctx.delete(&["ingress_webhook", id.as_str()]).await
}
