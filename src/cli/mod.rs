//! Command-line interface for bedmaker.
//!
//! Each stage is its own subcommand, and stages talk to each other through
//! the JSON Lines pipe format:
//!
//! - **transcripts**, **coordinates**, **genes**, **snps**: resolve inputs
//!   into a `regions` pipe
//! - **panels**: consolidate region pipes into a `panel` pipe
//! - **bedfiles**: write a BED file from a panel and record it in the audit log
//! - **validate**: prove a BED file round-trips to its inputs
//! - **audit**: list recorded BED files
//!
//! ## Usage
//!
//! ```text
//! bedmaker transcripts --ids NM_007294.4,NM_000546 > tx.jsonl
//! bedmaker coordinates --file hotspots.csv > coords.jsonl
//! bedmaker panels tx.jsonl coords.jsonl > panel.jsonl
//! bedmaker bedfiles panel.jsonl --policy policy.json --output panel.bed.gz
//! bedmaker validate panel.bed.gz --policy policy.json --panel panel.jsonl
//! ```

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::clients::{ensembl, panelapp, tark};
use crate::core::types::{Assembly, IdentifierNamespace};
use crate::resolve::{ResolverOptions, TranscriptFeature};

pub mod audit;
pub mod bedfiles;
pub mod context;
pub mod coordinates;
pub mod genes;
pub mod panels;
pub mod snps;
pub mod transcripts;
pub mod validate;

#[derive(Parser)]
#[command(name = "bedmaker")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Build auditable BED files from transcripts, genes, dbSNP IDs and coordinates")]
#[command(
    long_about = "bedmaker resolves transcript accessions, gene symbols, dbSNP identifiers and explicit coordinates into genomic regions, consolidates them into a panel, writes the panel as a BED file under a formatting policy, and validates that the file round-trips back to the original inputs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for reports
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve transcript accessions into regions
    Transcripts(transcripts::TranscriptsArgs),

    /// Validate explicit coordinates into regions
    Coordinates(coordinates::CoordinatesArgs),

    /// Resolve gene symbols into their MANE transcripts' regions
    Genes(genes::GenesArgs),

    /// Resolve dbSNP identifiers into regions
    Snps(snps::SnpsArgs),

    /// Consolidate region pipes into a panel
    Panels(panels::PanelsArgs),

    /// Write a BED file from a panel
    Bedfiles(bedfiles::BedfilesArgs),

    /// Validate a BED file against its inputs
    Validate(validate::ValidateArgs),

    /// List audit log entries
    Audit(audit::AuditArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where collaborator data comes from and where local state lives
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding the response cache and audit log [default: ~/.bedmaker]
    #[arg(long, global = true, env = "BEDMAKER_DB_DIR")]
    pub db_dir: Option<PathBuf>,

    /// Genome assembly
    #[arg(long, global = true, default_value = "GRCh38")]
    pub assembly: Assembly,

    /// Base URL of the TARK transcript archive
    #[arg(long, global = true, default_value = tark::DEFAULT_TARK_URL)]
    pub tark_url: String,

    /// Base URL of the Ensembl REST API [default: depends on --assembly]
    #[arg(long, global = true)]
    pub ensembl_url: Option<String>,

    /// Base URL of PanelApp
    #[arg(long, global = true, default_value = panelapp::DEFAULT_PANELAPP_URL)]
    pub panelapp_url: String,

    /// Answer lookups from a JSON fixture instead of the network
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Do not read or write the on-disk response cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

impl SourceArgs {
    #[must_use]
    pub fn db_dir(&self) -> PathBuf {
        self.db_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".bedmaker")
        })
    }

    #[must_use]
    pub fn ensembl_url(&self) -> &str {
        self.ensembl_url
            .as_deref()
            .unwrap_or_else(|| ensembl::default_url(self.assembly))
    }
}

/// Options shared by the transcript-based resolvers
#[derive(Args, Debug, Clone)]
pub struct ResolverArgs {
    /// Region per transcript span or per exon
    #[arg(long, default_value = "span")]
    pub feature: TranscriptFeature,

    /// Keep every transcript of a gene rather than its MANE transcripts
    #[arg(long)]
    pub all_transcripts: bool,

    /// Do not add MANE Plus Clinical transcripts next to MANE Select
    #[arg(long)]
    pub no_plus_clinical: bool,

    /// Namespace to use when a gene has transcripts in both
    #[arg(long, default_value = "refseq")]
    pub prefer: IdentifierNamespace,
}

impl ResolverArgs {
    #[must_use]
    pub fn options(&self, assembly: Assembly) -> ResolverOptions {
        ResolverOptions {
            assembly,
            feature: self.feature,
            all_transcripts: self.all_transcripts,
            include_plus_clinical: !self.no_plus_clinical,
            preferred_namespace: self.prefer,
        }
    }
}

/// Identifiers given on the command line and/or in a file
#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Comma-separated identifiers
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,

    /// File with one identifier per line (`#` comments allowed, `-` for stdin)
    #[arg(long)]
    pub file: Option<String>,

    /// Output pipe file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl IdArgs {
    /// All identifiers, command line first, blank and comment lines dropped
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or no identifier is given.
    pub fn identifiers(&self) -> anyhow::Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .ids
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(file) = &self.file {
            let bytes = read_input(file)?;
            for line in bytes.as_slice().lines() {
                let line = line?;
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    ids.push(line.to_string());
                }
            }
        }
        if ids.is_empty() {
            return Err(crate::error::Error::InvalidInput("no identifiers given (use --ids or --file)".to_string()).into());
        }
        Ok(ids)
    }
}

/// Read a whole input file, or stdin for `-`
///
/// # Errors
///
/// I/O errors.
pub fn read_input(path: &str) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if path == "-" {
        std::io::stdin().lock().read_to_end(&mut bytes)?;
    } else {
        File::open(path)
            .map_err(|e| anyhow::anyhow!("cannot open '{path}': {e}"))?
            .read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Buffered writer for a pipe output, stdout when no path is given
///
/// # Errors
///
/// I/O errors.
pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}
