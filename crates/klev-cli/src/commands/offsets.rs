use klev_api_models::{
    LogId, OffsetAckParams, OffsetCreateParams, OffsetId, OffsetOut, OffsetSetParams,
    OffsetUpdateParams, OffsetsOut,
};

use crate::cli::{OffsetAckArgs, OffsetCreateArgs, OffsetSetArgs, OffsetUpdateArgs, OffsetsCommand};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: OffsetsCommand) -> CliResult<()> {
    match command {
        OffsetsCommand::List(args) => render_json(&list_offsets(ctx, args.metadata).await?),
        OffsetsCommand::Create(args) => render_json(&create_offset(ctx, args).await?),
        OffsetsCommand::Get(args) => {
            render_json(&get_offset(ctx, &OffsetId::from_raw(args.id)).await?)
        }
        OffsetsCommand::Update(args) => render_json(&update_offset(ctx, args).await?),
        OffsetsCommand::Set(args) => render_json(&set_offset(ctx, args).await?),
        OffsetsCommand::Ack(args) => render_json(&ack_offset(ctx, args).await?),
        OffsetsCommand::Delete(args) => {
            render_json(&delete_offset(ctx, &OffsetId::from_raw(args.id)).await?)
        }
    }
}

pub(crate) async fn list_offsets(
    ctx: &AppContext,
    metadata: Option<String>,
) -> CliResult<OffsetsOut> {
    ctx.list_or_find("offsets", metadata).await
}

pub(crate) async fn create_offset(
    ctx: &AppContext,
    args: OffsetCreateArgs,
) -> CliResult<OffsetOut> {
    let params = OffsetCreateParams {
        log_id: LogId::from_raw(args.log_id),
        metadata: args.metadata,
    };
    ctx.post(&["offsets"], &params).await
}

pub(crate) async fn get_offset(ctx: &AppContext, id: &OffsetId) -> CliResult<OffsetOut> {
    ctx.get(&["offset", id.as_str()]).await
}

pub(crate) fn update_params(args: &OffsetUpdateArgs) -> OffsetUpdateParams {
    OffsetUpdateParams {
        metadata: args.metadata.clone(),
        value: args.value,
        value_metadata: args.value_metadata.clone(),
    }
}

pub(crate) async fn update_offset(
    ctx: &AppContext,
    args: OffsetUpdateArgs,
) -> CliResult<OffsetOut> {
    let params = update_params(&args);
    let id = OffsetId::from_raw(args.id);
    ctx.patch(&["offset", id.as_str()], &params).await
}

pub(crate) async fn set_offset(ctx: &AppContext, args: OffsetSetArgs) -> CliResult<OffsetOut> {
    let id = OffsetId::from_raw(args.id);
    let params = OffsetSetParams {
        value: args.value,
        value_metadata: args.value_metadata,
    };
    ctx.post(&["offset", id.as_str()], &params).await
}

pub(crate) async fn ack_offset(ctx: &AppContext, args: OffsetAckArgs) -> CliResult<OffsetOut> {
    let id = OffsetId::from_raw(args.id);
    let params = OffsetAckParams { value: args.value };
    ctx.post(&["offset", id.as_str(), "ack"], &params).await
}

pub(crate) async fn delete_offset(ctx: &AppContext, id: &OffsetId) -> CliResult<OffsetOut> {
    ctx.delete(&["offset", id.as_str()]).await
}
