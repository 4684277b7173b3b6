//! Opcodes command - print the instruction set.

use anyhow::Result;
use clap::Args;
use luac_chunk::OPCODES;

#[derive(Args)]
pub struct OpcodesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl OpcodesCommand {
    pub fn run(&self) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&OPCODES[..])?);
            return Ok(());
        }

        println!("{:>3}  {:<12} {:<6} flags", "id", "name", "mode");
        for (id, desc) in OPCODES.iter().enumerate() {
            let flags = [
                (desc.is_metamethod, "mm"),
                (desc.sets_top, "ot"),
                (desc.uses_top, "it"),
                (desc.is_test, "t"),
                (desc.sets_a, "a"),
            ]
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, flag)| *flag)
            .collect::<Vec<_>>()
            .join(",");
            println!("{:>3}  {:<12} {:<6} {}", id, desc.name, desc.mode.name(), flags);
        }
        Ok(())
    }
}
