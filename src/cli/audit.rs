use clap::Args;

use crate::cache::audit::{AuditEntry, AuditLog};
use crate::cli::context::AUDIT_FILE;
use crate::cli::{OutputFormat, SourceArgs};

#[derive(Args)]
pub struct AuditArgs {
    /// Only entries for this artifact hash
    pub artifact_hash: Option<String>,
}

pub fn run(args: AuditArgs, format: OutputFormat, sources: &SourceArgs) -> anyhow::Result<()> {
    let log = AuditLog::new(sources.db_dir().join(AUDIT_FILE));
    let entries = match &args.artifact_hash {
        Some(hash) => log.find(hash)?,
        None => log.entries()?,
    };

    match format {
        OutputFormat::Text => print_text(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn print_text(entries: &[AuditEntry]) {
    if entries.is_empty() {
        println!("No audit entries");
        return;
    }
    println!("recorded_at\tartifact_hash\tpolicy\tregions\toutput");
    for e in entries {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            e.recorded_at,
            e.artifact_hash,
            e.policy.id,
            e.region_count,
            e.output.as_deref().unwrap_or("-")
        );
    }
}
