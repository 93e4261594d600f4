use clap::Args;

use crate::cli::context::Context;
use crate::cli::{open_output, IdArgs, SourceArgs};
use crate::pipe;
use crate::resolve::ResolverOptions;

#[derive(Args)]
pub struct SnpsArgs {
    #[command(flatten)]
    pub input: IdArgs,
}

pub fn run(args: SnpsArgs, sources: &SourceArgs) -> anyhow::Result<()> {
    let rsids = args.input.identifiers()?;
    let context = Context::from_args(sources)?;
    let options = ResolverOptions {
        assembly: sources.assembly,
        ..ResolverOptions::default()
    };
    let regions = context.resolvers(options).snps().resolve_batch(&rsids)?;
    pipe::write_regions(open_output(args.input.output.as_deref())?, &regions)?;
    Ok(())
}
