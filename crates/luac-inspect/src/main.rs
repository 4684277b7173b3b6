//! luac-inspect - inspect precompiled Lua 5.4 chunks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "luac-inspect",
    version,
    about = "Inspect, list and validate Lua 5.4 binary chunks",
    long_about = "Loads chunks produced by `luac` and prints what is inside.\n\n\
                  List a chunk:      luac-inspect list luac.out\n\
                  Validate chunks:   luac-inspect check a.luac b.luac\n\
                  Read from stdin:   luac -o - x.lua | luac-inspect info -"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a `luac -l -l` style listing
    List(commands::list::ListCommand),

    /// Summarize a chunk
    Info(commands::info::InfoCommand),

    /// Load chunks and report the first error in each
    Check(commands::check::CheckCommand),

    /// Print the opcode table
    Opcodes(commands::opcodes::OpcodesCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.parse()?))
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List(cmd) => cmd.run(&config),
        Commands::Info(cmd) => cmd.run(&config),
        Commands::Check(cmd) => cmd.run(&config),
        Commands::Opcodes(cmd) => cmd.run(),
    }
}
