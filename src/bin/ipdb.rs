mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_inspect, cmd_query};

#[derive(Parser)]
#[command(name = "ipdb")]
#[command(
    about = "Query and inspect IPDB geolocation databases",
    long_about = "ipdb - Zero-copy reader for IPDB geolocation databases\n\n\
    Looks up IPv4/IPv6 addresses in IPDB files by walking the binary trie stored\n\
    in the file, then decodes the per-language fields of the matching record.\n\n\
    Examples:\n\
      ipdb query ipipfree.ipdb 8.8.8.8\n\
      ipdb query ipipfree.ipdb 8.8.8.8 --lang EN\n\
      ipdb inspect ipipfree.ipdb --verbose\n\n\
    Set RUST_LOG=ipdb=debug to trace loading on stderr."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up an IP address in a database
    Query {
        /// Path to the IPDB database
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// IP address to look up
        #[arg(value_name = "IP")]
        ip: String,

        /// Only output fields for this language (default: all languages)
        #[arg(short, long)]
        lang: Option<String>,

        /// Read the file into memory instead of memory-mapping it
        #[arg(long)]
        in_memory: bool,

        /// Quiet mode - no output, only exit code (0 = found, 1 = not found)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Inspect a database's metadata
    Inspect {
        /// Path to the IPDB database
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output metadata as JSON
        #[arg(short, long)]
        json: bool,

        /// Materialize the trie and report node statistics
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            database,
            ip,
            lang,
            in_memory,
            quiet,
        } => cmd_query(database, ip, lang, in_memory, quiet),
        Commands::Inspect {
            database,
            json,
            verbose,
        } => cmd_inspect(database, json, verbose),
    }
}
