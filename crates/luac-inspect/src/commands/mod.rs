//! CLI command implementations.

pub mod check;
pub mod info;
pub mod list;
pub mod opcodes;

use anyhow::{Context, Result};
use luac_chunk::{LoaderConfig, Prototype, read_from, undump_with};
use std::path::Path;

/// Load a chunk from `path`, or from stdin when `path` is `-`
pub fn load_chunk(path: &Path, config: &LoaderConfig) -> Result<Prototype> {
    if path.as_os_str() == "-" {
        let stdin = std::io::stdin();
        return read_from(&mut stdin.lock(), config).context("Failed to load chunk from stdin");
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    undump_with(&bytes, config).with_context(|| format!("Failed to load {}", path.display()))
}
