use clap::Args;
use tracing::info;

use crate::cli::context::Context;
use crate::cli::{open_output, IdArgs, ResolverArgs, SourceArgs};
use crate::pipe;

#[derive(Args)]
pub struct GenesArgs {
    #[command(flatten)]
    pub input: IdArgs,

    #[command(flatten)]
    pub resolver: ResolverArgs,
}

pub fn run(args: GenesArgs, sources: &SourceArgs) -> anyhow::Result<()> {
    let genes = args.input.identifiers()?;
    let context = Context::from_args(sources)?;
    let resolvers = context.resolvers(args.resolver.options(sources.assembly));

    let regions: Vec<_> = resolvers
        .genes()
        .resolve_batch(&genes)?
        .into_iter()
        .flatten()
        .flat_map(|t| t.regions)
        .collect();
    info!("Resolved {} gene(s) into {} region(s)", genes.len(), regions.len());

    pipe::write_regions(open_output(args.input.output.as_deref())?, &regions)?;
    Ok(())
}
