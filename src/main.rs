use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod parsing;
mod scheme;
mod subtyping;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("tile_subtyper=debug,info")
    } else {
        EnvFilter::new("tile_subtyper=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Subtype(args) => {
            cli::subtype::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Scheme(args) => {
            cli::scheme::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
