//! Info command - summarize a chunk.

use anyhow::Result;
use clap::Args;
use luac_chunk::Prototype;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct InfoCommand {
    /// Chunk file (`-` for stdin)
    pub chunk: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Include the decoded main function in JSON output
    #[arg(long, requires = "json")]
    pub full: bool,
}

impl InfoCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let main = super::load_chunk(&self.chunk, &config.loader)?;
        let info = ChunkInfo::collect(&main, self.full);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_human_readable(&info);
        }

        Ok(())
    }
}

fn print_human_readable(info: &ChunkInfo) {
    println!("Source:        {}", info.source);
    println!("Functions:     {}", info.functions);
    println!("Instructions:  {}", info.instructions);
    println!("Constants:     {}", info.constants);
    println!("Max depth:     {}", info.max_depth);
    println!(
        "Debug info:    {}",
        if info.stripped { "stripped" } else { "present" }
    );
    println!();
    println!("Functions:");
    for f in &info.function_list {
        println!(
            "  <{}:{},{}>  {} instructions, {} constants, {} upvalues, {} nested",
            f.source,
            f.line_defined,
            f.last_line_defined,
            f.instructions,
            f.constants,
            f.upvalues,
            f.nested
        );
    }
}

#[derive(Serialize)]
struct ChunkInfo<'a> {
    source: String,
    functions: usize,
    instructions: usize,
    constants: usize,
    max_depth: usize,
    stripped: bool,
    function_list: Vec<FunctionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main: Option<&'a Prototype>,
}

#[derive(Serialize)]
struct FunctionInfo {
    source: String,
    line_defined: u32,
    last_line_defined: u32,
    instructions: usize,
    constants: usize,
    upvalues: usize,
    nested: usize,
}

impl<'a> ChunkInfo<'a> {
    fn collect(main: &'a Prototype, full: bool) -> Self {
        let function_list: Vec<FunctionInfo> = main
            .descendants()
            .map(|p| FunctionInfo {
                source: p.source.to_string(),
                line_defined: p.line_defined,
                last_line_defined: p.last_line_defined,
                instructions: p.code.len(),
                constants: p.constants.len(),
                upvalues: p.upvalues.len(),
                nested: p.protos.len(),
            })
            .collect();

        Self {
            source: main.source.to_string(),
            functions: function_list.len(),
            instructions: function_list.iter().map(|f| f.instructions).sum(),
            constants: function_list.iter().map(|f| f.constants).sum(),
            max_depth: main.nesting_depth(),
            stripped: main.descendants().all(|p| p.line_info.is_empty()),
            function_list,
            main: full.then_some(main),
        }
    }
}
