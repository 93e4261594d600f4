use clap::Args;
use std::path::PathBuf;

use crate::cli::{open_output, read_input};
use crate::error::Error;
use crate::pipe;
use crate::resolve::coordinates::{parse_coordinates_csv, resolve_coordinates};

#[derive(Args)]
pub struct CoordinatesArgs {
    /// One `chromosome,start,stop,region_id[,strand]` row; repeatable
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// CSV file of coordinate rows (`-` for stdin)
    #[arg(long)]
    pub file: Option<String>,

    /// Output pipe file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: CoordinatesArgs) -> anyhow::Result<()> {
    let mut inputs = parse_coordinates_csv(&args.regions.join("\n"))?;
    if let Some(file) = &args.file {
        let bytes = read_input(file)?;
        let content = String::from_utf8(bytes).map_err(|e| Error::InvalidInput(format!("{file} is not UTF-8: {e}")))?;
        inputs.extend(parse_coordinates_csv(&content)?);
    }

    if inputs.is_empty() {
        return Err(Error::InvalidInput("no coordinates given (use --region or --file)".to_string()).into());
    }
    let regions = resolve_coordinates(&inputs)?;
    pipe::write_regions(open_output(args.output.as_deref())?, &regions)?;
    Ok(())
}
