use clap::Args;
use tracing::info;

use crate::cli::context::Context;
use crate::cli::{open_output, IdArgs, ResolverArgs, SourceArgs};
use crate::pipe;

#[derive(Args)]
pub struct TranscriptsArgs {
    #[command(flatten)]
    pub input: IdArgs,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Pipe kind to write
    #[arg(long, default_value = "regions")]
    pub emit: Emit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Emit {
    /// Flat regions, ready for `panels`
    Regions,
    /// Resolved transcripts with their annotation
    Transcripts,
}

pub fn run(args: TranscriptsArgs, sources: &SourceArgs) -> anyhow::Result<()> {
    let ids = args.input.identifiers()?;
    let context = Context::from_args(sources)?;
    let resolvers = context.resolvers(args.resolver.options(sources.assembly));

    let transcripts = resolvers.transcripts().resolve_batch(&ids)?;
    info!("Resolved {} transcript(s)", transcripts.len());

    let out = open_output(args.input.output.as_deref())?;
    match args.emit {
        Emit::Transcripts => pipe::write_transcripts(out, &transcripts)?,
        Emit::Regions => {
            let regions: Vec<_> = transcripts.into_iter().flat_map(|t| t.regions).collect();
            pipe::write_regions(out, &regions)?;
        }
    }
    Ok(())
}
