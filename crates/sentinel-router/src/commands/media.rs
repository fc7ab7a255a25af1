use crate::context::CommandContext;
use crate::error::Result;
use crate::menus;

/// `movie <title>`: search the catalog and open a numbered menu.
pub async fn movie(ctx: &CommandContext) -> Result<()> {
    let query = ctx.command.raw_args.trim();
    if query.is_empty() {
        return Err(ctx.usage());
    }
    menus::open_search(ctx, query).await
}
