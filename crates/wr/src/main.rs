//! wr CLI - wiki markup rendering.
//!
//! Provides commands for:
//! - `render`: Convert a document from one syntax to another
//! - `syntaxes`: List the input and output syntaxes
//! - `macros`: List the available macros

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{MacrosArgs, RenderArgs};
use output::Output;

/// wr - wiki markup rendering.
#[derive(Parser)]
#[command(name = "wr", version, about)]
struct Cli {
    /// Enable verbose output (info level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to another syntax.
    Render(RenderArgs),
    /// List the supported syntaxes.
    Syntaxes,
    /// List the available macros.
    Macros(MacrosArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Syntaxes => commands::syntaxes::execute(),
        Commands::Macros(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["wr", "render", "page.xwiki", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
