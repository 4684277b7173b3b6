//! List command - print a chunk's functions and instructions.

use anyhow::Result;
use clap::Args;
use luac_chunk::listing;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct ListCommand {
    /// Chunk file (`-` for stdin)
    pub chunk: PathBuf,

    /// Only print code, without the constant/local/upvalue tables
    #[arg(long, short = 'c')]
    pub code_only: bool,
}

impl ListCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let main = super::load_chunk(&self.chunk, &config.loader)?;

        let mut options = config.listing;
        if self.code_only {
            options.show_constants = false;
            options.show_locals = false;
            options.show_upvalues = false;
        }
        print!("{}", listing::render_with(&main, &options));
        Ok(())
    }
}
