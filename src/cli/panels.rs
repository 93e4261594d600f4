use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::cli::{open_output, read_input};
use crate::panels::Consolidator;
use crate::pipe;

#[derive(Args)]
pub struct PanelsArgs {
    /// Pipe files to consolidate (`-` for stdin)
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Output panel pipe (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: PanelsArgs) -> anyhow::Result<()> {
    let mut consolidator = Consolidator::new();
    for input in &args.inputs {
        let bytes = read_input(input)?;
        let name = if input == "-" { "<stdin>" } else { input.as_str() };
        let regions = pipe::read_regions(bytes.as_slice())?;
        info!("Read {} region(s) from {name}", regions.len());
        consolidator.add_source_file(name, &bytes).add_regions(regions);
    }

    let panel = consolidator.build()?;
    pipe::write_panel(open_output(args.output.as_deref())?, &panel)?;
    Ok(())
}
