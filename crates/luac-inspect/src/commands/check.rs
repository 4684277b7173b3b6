//! Check command - load chunks without printing them.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct CheckCommand {
    /// Chunk files to validate
    #[arg(required = true)]
    pub chunks: Vec<PathBuf>,

    /// Only show failures
    #[arg(long)]
    pub quiet: bool,
}

impl CheckCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut failed = 0;
        for path in &self.chunks {
            match super::load_chunk(path, &config.loader) {
                Ok(main) => {
                    if !self.quiet {
                        println!(
                            "ok      {} ({} functions)",
                            path.display(),
                            main.descendants().count()
                        );
                    }
                }
                Err(err) => {
                    failed += 1;
                    println!("error   {}: {:#}", path.display(), err);
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{} of {} chunk(s) failed to load", failed, self.chunks.len());
        }
        Ok(())
    }
}
