use klev_api_models::{
    FilterCreateParams, FilterId, FilterOut, FilterStatusOut, FilterUpdateParams, FiltersOut,
    LogId,
};

use crate::cli::{FilterCreateArgs, FilterUpdateArgs, FiltersCommand};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: FiltersCommand) -> CliResult<()> {
    match command {
        FiltersCommand::List(args) => render_json(&list_filters(ctx, args.metadata).await?),
        FiltersCommand::Create(args) => render_json(&create_filter(ctx, args).await?),
        FiltersCommand::Get(args) => render_json(&get_filter(ctx, &args.id.parse()?).await?),
        FiltersCommand::Update(args) => render_json(&update_filter(ctx, args).await?),
        FiltersCommand::Status(args) => {
            render_json(&filter_status(ctx, &args.id.parse()?).await?)
        }
        FiltersCommand::Delete(args) => {
            render_json(&delete_filter(ctx, &args.id.parse()?).await?)
        }
    }
}

pub(crate) async fn list_filters(
    ctx: &AppContext,
    metadata: Option<String>,
) -> CliResult<FiltersOut> {
    ctx.list_or_find("filters", metadata).await
}

pub(crate) async fn create_filter(
    ctx: &AppContext,
    args: FilterCreateArgs,
) -> CliResult<FilterOut> {
    let source_id: LogId = args.source_id.parse()?;
    let target_id: LogId = args.target_id.parse()?;
    let params = FilterCreateParams {
        source_id,
        target_id,
        metadata: args.metadata,
        expression: args.expression,
    };
    ctx.post(&["filters"], &params).await
}

pub(crate) async fn get_filter(ctx: &AppContext, id: &FilterId) -> CliResult<FilterOut> {
    ctx.get(&["filter", id.as_str()]).await
}

pub(crate) async fn update_filter(
    ctx: &AppContext,
    args: FilterUpdateArgs,
) -> CliResult<FilterOut> {
    let id: FilterId = args.id.parse()?;
    let params = FilterUpdateParams {
        metadata: args.metadata,
        expression: args.expression,
    };
    ctx.patch(&["filter", id.as_str()], &params).await
}

pub(crate) async fn filter_status(ctx: &AppContext, id: &FilterId) -> CliResult<FilterStatusOut> {
    ctx.get(&["filter", id.as_str(), "status"]).await
}

pub(crate) async fn delete_filter(ctx: &AppContext, id: &FilterId) -> CliResult<FilterOut> {
    ctx.delete(&["filter", id.as_str()]).await
}
