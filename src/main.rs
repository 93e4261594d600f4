use clap::Parser;
use tracing_subscriber::EnvFilter;

use bedmaker::cli::{self, Cli, Commands};
use bedmaker::Error;

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Transcripts(args) => cli::transcripts::run(args, &cli.sources),
        Commands::Coordinates(args) => cli::coordinates::run(args),
        Commands::Genes(args) => cli::genes::run(args, &cli.sources),
        Commands::Snps(args) => cli::snps::run(args, &cli.sources),
        Commands::Panels(args) => cli::panels::run(args),
        Commands::Bedfiles(args) => cli::bedfiles::run(args, cli.format, &cli.sources),
        Commands::Validate(args) => cli::validate::run(args, cli.format, &cli.sources),
        Commands::Audit(args) => cli::audit::run(args, cli.format, &cli.sources),
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays a clean pipe
    let filter = if cli.verbose {
        EnvFilter::new("bedmaker=debug,info")
    } else {
        EnvFilter::new("bedmaker=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        let code = e
            .downcast_ref::<Error>()
            .map_or(1, |e| e.category().exit_code());
        std::process::exit(code);
    }
}
