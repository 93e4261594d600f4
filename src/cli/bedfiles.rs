use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use crate::bedfiles::{writer, FormattingPolicy};
use crate::cache::audit::{AuditEntry, AuditLog};
use crate::cli::context::AUDIT_FILE;
use crate::cli::{read_input, OutputFormat, SourceArgs};
use crate::pipe;

#[derive(Args)]
pub struct BedfilesArgs {
    /// Panel pipe (`-` for stdin)
    #[arg(required = true)]
    pub panel: String,

    /// Formatting policy JSON (default policy when omitted)
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Output BED file, gzip-compressed when it ends in `.gz` (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not append to the audit log
    #[arg(long)]
    pub no_audit: bool,
}

pub fn run(args: BedfilesArgs, format: OutputFormat, sources: &SourceArgs) -> anyhow::Result<()> {
    let policy = match &args.policy {
        Some(path) => FormattingPolicy::load(path)?,
        None => FormattingPolicy::default(),
    };
    let panel = pipe::read_panel(read_input(&args.panel)?.as_slice())?;
    let bed = writer::write(&panel, &policy)?;

    let hash = match &args.output {
        Some(path) => writer::write_to_path(&bed, path)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bed.render().as_bytes())?;
            stdout.flush()?;
            bed.artifact_hash()
        }
    };

    if !args.no_audit {
        let entry = AuditEntry::new(&panel, &bed, &policy, args.output.as_deref());
        AuditLog::new(sources.db_dir().join(AUDIT_FILE)).append(&entry)?;
    }

    // Keep stdout clean when it carries the BED itself
    if args.output.is_some() {
        match format {
            OutputFormat::Text => println!("{hash}\t{} record(s)", bed.len()),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "artifact_hash": hash,
                    "records": bed.len(),
                    "policy": policy.id,
                    "panel_digest": panel.digest(),
                })
            ),
        }
    }
    Ok(())
}
