use klev_api_models::PathsOut;

use crate::client::{AppContext, CliResult};
use crate::output::render_json;

pub(crate) async fn run(ctx: &AppContext) -> CliResult<()> {
    render_json(&fetch_paths(ctx).await?)
}

/// Fetch the API path index; a cheap call that proves the token is accepted.
pub(crate) async fn fetch_paths(ctx: &AppContext) -> CliResult<PathsOut> {
    ctx.get(&["paths"]).await
}
