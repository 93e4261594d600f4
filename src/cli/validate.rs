use clap::Args;
use std::path::PathBuf;

use crate::bedfiles::reader::read_bed;
use crate::bedfiles::FormattingPolicy;
use crate::cli::context::Context;
use crate::cli::{read_input, OutputFormat, ResolverArgs, SourceArgs};
use crate::error::Error;
use crate::pipe;
use crate::resolve::coordinates::parse_coordinates_file;
use crate::resolve::source::{PanelSource, ReferenceRegion};
use crate::resolve::InputRecords;
use crate::validate::{ValidationOptions, ValidationReport, Validator};

#[derive(Args)]
pub struct ValidateArgs {
    /// BED file to validate (plain or `.gz`)
    #[arg(required = true)]
    pub bed: PathBuf,

    /// Formatting policy the file was written with (default policy when omitted)
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Panel pipe the file was written from
    #[arg(long, conflicts_with_all = ["transcripts", "genes", "snps", "coordinates"])]
    pub panel: Option<String>,

    /// Original transcript inputs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub transcripts: Vec<String>,

    /// Original gene inputs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub genes: Vec<String>,

    /// Original dbSNP inputs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub snps: Vec<String>,

    /// Original coordinates CSV
    #[arg(long)]
    pub coordinates: Option<PathBuf>,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Also check coverage against a PanelApp panel
    #[arg(long, conflicts_with = "reference_file")]
    pub reference_panel: Option<String>,

    /// Also check coverage against a JSON list of reference regions
    #[arg(long)]
    pub reference_file: Option<PathBuf>,

    /// Report drift between the panel and its current resolution without failing
    #[arg(long)]
    pub allow_drift: bool,

    /// With --panel, compare against the recorded panel only
    #[arg(long, requires = "panel")]
    pub skip_drift: bool,
}

impl ValidateArgs {
    fn inputs(&self) -> Result<InputRecords, Error> {
        let clean = |ids: &[String]| -> Vec<String> {
            ids.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
        };
        Ok(InputRecords {
            transcripts: clean(&self.transcripts),
            genes: clean(&self.genes),
            snps: clean(&self.snps),
            coordinates: match &self.coordinates {
                Some(path) => parse_coordinates_file(path)?,
                None => Vec::new(),
            },
        })
    }
}

pub fn run(args: ValidateArgs, format: OutputFormat, sources: &SourceArgs) -> anyhow::Result<()> {
    let policy = match &args.policy {
        Some(path) => FormattingPolicy::load(path)?,
        None => FormattingPolicy::default(),
    };
    let bed = read_bed(&args.bed)?;

    let panel = args
        .panel
        .as_deref()
        .map(|p| read_input(p).and_then(|bytes| Ok(pipe::read_panel(bytes.as_slice())?)))
        .transpose()?;
    let inputs = args.inputs()?;
    if panel.is_none() && inputs.is_empty() {
        return Err(Error::InvalidInput(
            "nothing to validate against: give --panel or at least one of --transcripts, --genes, --snps, --coordinates"
                .to_string(),
        )
        .into());
    }

    // Building the context does not touch the network
    let context = Context::from_args(sources)?;

    let reference: Option<Vec<ReferenceRegion>> = match (&args.reference_panel, &args.reference_file) {
        (Some(id), _) => Some(context.panels.get_panel(id)?),
        (None, Some(path)) => Some(serde_json::from_slice(&std::fs::read(path)?)?),
        (None, None) => None,
    };

    let mut validator = Validator::new(&policy).with_options(ValidationOptions {
        allow_source_drift: args.allow_drift,
    });
    if let Some(reference) = reference {
        validator = validator.with_reference(reference);
    }

    let resolvers = context.resolvers(args.resolver.options(sources.assembly));
    let report = match &panel {
        Some(panel) if args.skip_drift => validator.validate_panel(&bed, panel)?,
        Some(panel) => validator.validate_recorded_panel(&bed, panel, &resolvers)?,
        None => validator.validate_inputs(&bed, &inputs, &resolvers)?,
    };

    print_report(&report, format)?;
    report.into_result()?;
    Ok(())
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
