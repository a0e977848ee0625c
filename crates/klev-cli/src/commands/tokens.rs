use klev_api_models::{TokenCreateParams, TokenId, TokenOut, TokenUpdateParams, TokensOut};

use crate::cli::{TokenCreateArgs, TokenUpdateArgs, TokensCommand};
use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext, command: TokensCommand) -> CliResult<()> {
    match command {
        TokensCommand::List(args) => render_json(&list_tokens(ctx, args.metadata).await?),
        TokensCommand::Create(args) => render_json(&create_token(ctx, args).await?),
        TokensCommand::Get(args) => render_json(&get_token(ctx, &args.id.parse()?).await?),
        TokensCommand::Update(args) => render_json(&update_token(ctx, args).await?),
        TokensCommand::Delete(args) => render_json(&delete_token(ctx, &args.id.parse()?).await?),
    }
}

pub(crate) async fn list_tokens(
    ctx: &AppContext,
    metadata: Option<String>,
) -> CliResult<TokensOut> {
    ctx.list_or_find("tokens", metadata).await
}

/// Create a token; the response carries the bearer secret exactly once.
pub(crate) async fn create_token(ctx: &AppContext, args: TokenCreateArgs) -> CliResult<TokenOut> {
    let params = TokenCreateParams {
        metadata: args.metadata,
        acl: args.acl,
    };
    ctx.post(&["tokens"], &params).await
}

pub(crate) async fn get_token(ctx: &AppContext, id: &TokenId) -> CliResult<TokenOut> {
    ctx.get(&["token", id.as_str()]).await
}

pub(crate) async fn update_token(ctx: &AppContext, args: TokenUpdateArgs) -> CliResult<TokenOut> {
    let id: TokenId = args.id.parse()?;
    let params = TokenUpdateParams {
        metadata: args.metadata,
        acl: args.acl,
    };
    ctx.patch(&["token", id.as_str()], &params).await
}

pub(crate) async fn delete_token(ctx: &AppContext, id: &TokenId) -> CliResult<TokenOut> {
    ctx.delete(&["token", id.as_str()]).await
}
